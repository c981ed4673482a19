//! Domain types for quotevault

pub mod bar;
pub mod ids;
pub mod info;
pub mod time;

pub use bar::{Bar, PRICE_TOLERANCE};
pub use ids::{InvalidSecurityId, SecurityId};
pub use info::DescriptiveInfo;
pub use time::{end_of_day, format_timestamp, parse_timestamp, start_of_day, Timestamp};
