//! Timestamp helpers.
//!
//! Timestamps are timezone-naive with second resolution. The canonical text
//! form is `YYYY-MM-DDTHH:MM:SS`; a bare `YYYY-MM-DD` is read as midnight.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, ParseError};

/// A point in time, no timezone attached.
pub type Timestamp = NaiveDateTime;

/// Canonical on-disk format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a timestamp in canonical form, with a space separator, or as a bare date.
pub fn parse_timestamp(s: &str) -> Result<Timestamp, ParseError> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(start_of_day))
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Midnight at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> Timestamp {
    date.and_time(NaiveTime::MIN)
}

/// Pins `ts` to 23:59:59 of its calendar day.
///
/// A daily bar stands for the whole session, so a committed range that ends on
/// a bar's day must cover every instant of that day.
pub fn end_of_day(ts: Timestamp) -> Timestamp {
    ts.date().and_hms_opt(23, 59, 59).unwrap_or(ts)
}
