//! Phonetic index strings for non-Latin heading titles.
//!
//! Titles written in Cyrillic, CJK, Greek and similar scripts are
//! transliterated once at index time so substring matching against
//! Latin query text still finds them. ASCII titles get no index entry.

/// Compute the cached transliteration for a title, or `None` when the
/// title is plain ASCII or transliteration adds nothing.
pub fn phonetic_index(title: &str) -> Option<String> {
    if title.is_ascii() {
        return None;
    }

    let translit = deunicode::deunicode(title).to_lowercase();
    let normalized: String =
        translit.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalized.is_empty() || normalized == title.to_lowercase() {
        return None;
    }
    Some(normalized)
}
