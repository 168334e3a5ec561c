//! Scheduled start time parsing.
//!
//! Buy times are written as local wall-clock time, `YYYY-MM-DD HH:MM:SS`,
//! optionally with fractional seconds.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone, Utc};

/// Accepted buy time format (local time).
pub const BUY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Buy time used when an item does not specify one: start immediately.
pub const IMMEDIATE_BUY_TIME: &str = "1970-01-01 00:00:00";

/// Parse a local buy time into a UTC instant.
///
/// # Errors
/// Returns `CoreError::InvalidBuyTime` if the string does not match
/// [`BUY_TIME_FORMAT`] (with or without fractional seconds) or names a
/// local time that does not exist (DST gap).
pub fn parse_buy_time(value: &str) -> Result<DateTime<Utc>> {
    parse_buy_time_in(value, &Local)
}

/// Parse a buy time in an explicit time zone.
pub fn parse_buy_time_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    let naive = NaiveDateTime::parse_from_str(trimmed, BUY_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| CoreError::InvalidBuyTime {
            value: value.to_string(),
            reason: e.to_string(),
        })?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // DST fold: earliest instant.
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(CoreError::InvalidBuyTime {
            value: value.to_string(),
            reason: "local time does not exist".to_string(),
        }),
    }
}
