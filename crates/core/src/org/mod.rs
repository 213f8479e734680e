//! Line-based parsing for the org outline subset: headlines, planning
//! lines, property drawers, `#+` directives and timestamps.

pub mod parser;
pub mod phonetic;
pub mod timestamp;

pub use parser::{HeadingNode, OrgDocument, TodoVocabulary, parse_document};
pub use phonetic::phonetic_index;
pub use timestamp::{OrgTimestamp, day_bounds_utc, parse_date_token};
