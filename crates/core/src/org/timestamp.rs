//! Org timestamp parsing and date arithmetic.

use std::sync::LazyLock;

use chrono::{
    DateTime, Duration, Local, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc,
};
use regex::Regex;

// Matches <2024-01-15 Mon 10:30> and [2024-01-15] forms. Weekday and
// time are optional; repeater/delay cookies (+1w, .+1m, --2d) are
// tolerated and ignored.
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([<\[])(\d{4})-(\d{2})-(\d{2})(?:\s+\pL{1,10}\.?)?(?:\s+(\d{1,2}):(\d{2}))?(?:\s+[.+-]{1,2}\d+[hdwmy])*\s*([>\]])",
    )
    .unwrap()
});

static RELATIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^today(?:([+-])(\d+)([dwmy]))?$").unwrap());

/// A timestamp as written in an org file. Date-only stamps resolve to
/// local midnight when converted to an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrgTimestamp {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    /// Active stamps use angle brackets, inactive use square brackets.
    pub active: bool,
}

impl OrgTimestamp {
    /// Parse the first timestamp found in `s`.
    pub fn parse(s: &str) -> Option<Self> {
        for cap in TIMESTAMP_RE.captures_iter(s) {
            let open = &cap[1];
            let close = &cap[7];
            let active = match (open, close) {
                ("<", ">") => true,
                ("[", "]") => false,
                _ => continue,
            };

            let year: i32 = cap[2].parse().ok()?;
            let month: u32 = cap[3].parse().ok()?;
            let day: u32 = cap[4].parse().ok()?;
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                continue;
            };

            let time = match (cap.get(5), cap.get(6)) {
                (Some(h), Some(m)) => {
                    let hour: u32 = h.as_str().parse().ok()?;
                    let minute: u32 = m.as_str().parse().ok()?;
                    NaiveTime::from_hms_opt(hour, minute, 0)
                }
                _ => None,
            };

            return Some(Self { date, time, active });
        }
        None
    }

    /// Resolve to an absolute instant, interpreting the stamp in the
    /// local timezone.
    pub fn to_utc(&self) -> DateTime<Utc> {
        let time = self.time.unwrap_or(NaiveTime::MIN);
        local_to_utc(self.date.and_time(time))
    }
}

/// Resolve a query date token: `2024-01-15`, `today`, or
/// `today{+|-}N{d|w|m|y}`. Relative tokens count from `today`.
pub fn parse_date_token(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(cap) = RELATIVE_RE.captures(token) {
        let Some(sign) = cap.get(1) else {
            return Some(today);
        };
        let n: u32 = cap[2].parse().ok()?;
        let forward = sign.as_str() == "+";
        return shift_date(today, n, &cap[3], forward);
    }
    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

fn shift_date(date: NaiveDate, n: u32, unit: &str, forward: bool) -> Option<NaiveDate> {
    let days = |count: i64| {
        let delta = if forward { count } else { -count };
        date.checked_add_signed(Duration::days(delta))
    };
    match unit {
        "d" => days(i64::from(n)),
        "w" => days(i64::from(n) * 7),
        "m" => {
            let months = Months::new(n);
            if forward { date.checked_add_months(months) } else { date.checked_sub_months(months) }
        }
        "y" => {
            let months = Months::new(n * 12);
            if forward { date.checked_add_months(months) } else { date.checked_sub_months(months) }
        }
        _ => None,
    }
}

/// Half-open UTC window covering one local calendar day:
/// [local midnight, next local midnight).
pub fn day_bounds_utc(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.checked_add_signed(Duration::days(1)).unwrap_or(date);
    (local_to_utc(date.and_time(NaiveTime::MIN)), local_to_utc(next.and_time(NaiveTime::MIN)))
}

fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_active_timestamp_with_time() {
        let ts = OrgTimestamp::parse("SCHEDULED: <2024-01-15 Mon 10:30>").unwrap();
        assert_eq!(ts.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(ts.time, NaiveTime::from_hms_opt(10, 30, 0));
        assert!(ts.active);
    }

    #[test]
    fn parses_inactive_date_only() {
        let ts = OrgTimestamp::parse("[2023-12-01]").unwrap();
        assert_eq!(ts.date, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert_eq!(ts.time, None);
        assert!(!ts.active);
    }

    #[test]
    fn ignores_repeater_cookie() {
        let ts = OrgTimestamp::parse("<2024-03-01 Fri +1w>").unwrap();
        assert_eq!(ts.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(ts.time, None);
    }

    #[test]
    fn skips_mismatched_brackets() {
        assert_eq!(OrgTimestamp::parse("<2024-01-15]"), None);
    }

    #[test]
    fn rejects_invalid_calendar_date() {
        assert_eq!(OrgTimestamp::parse("<2024-13-45>"), None);
    }

    #[test]
    fn date_only_stamp_falls_inside_its_day_window() {
        let ts = OrgTimestamp::parse("<2024-06-10 Mon>").unwrap();
        let instant = ts.to_utc();
        let (start, end) = day_bounds_utc(ts.date);
        assert!(instant >= start && instant < end);
    }

    #[rstest]
    #[case("today", 0)]
    #[case("today+3d", 3)]
    #[case("today-2d", -2)]
    #[case("today+2w", 14)]
    #[case("today-1w", -7)]
    fn resolves_relative_day_tokens(#[case] token: &str, #[case] offset: i64) {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let expected = today.checked_add_signed(Duration::days(offset)).unwrap();
        assert_eq!(parse_date_token(token, today), Some(expected));
    }

    #[test]
    fn resolves_month_and_year_tokens() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        assert_eq!(
            parse_date_token("today+1m", today),
            NaiveDate::from_ymd_opt(2024, 6, 15)
        );
        assert_eq!(
            parse_date_token("today-1y", today),
            NaiveDate::from_ymd_opt(2023, 5, 15)
        );
    }

    #[test]
    fn resolves_absolute_dates() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        assert_eq!(
            parse_date_token("2022-02-28", today),
            NaiveDate::from_ymd_opt(2022, 2, 28)
        );
        assert_eq!(parse_date_token("not-a-date", today), None);
    }
}
