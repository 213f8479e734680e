pub mod doctor;
pub mod index;
pub mod output;
pub mod query;
pub mod reset;
pub mod stats;
pub mod watch;
