//! Column encoding helpers shared by the row mappers.
//!
//! Timestamps are stored as RFC-3339 text with a fixed number of fractional
//! digits so that lexical order in SQL matches chronological order.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, SubsecRound, Utc};
use civic_shared::UserId;
use rusqlite::types::Type;

/// Current time at the precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Current time at a fixed offset east of UTC.
pub(crate) fn now_at(offset: FixedOffset) -> DateTime<FixedOffset> {
    now().with_timezone(&offset)
}

pub(crate) fn encode_utc(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn encode_fixed(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn conversion<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

pub(crate) fn user_id(idx: usize, s: &str) -> rusqlite::Result<UserId> {
    UserId::parse(s).map_err(|e| conversion(idx, e))
}

pub(crate) fn utc(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}

pub(crate) fn fixed(idx: usize, s: &str) -> rusqlite::Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).map_err(|e| conversion(idx, e))
}

/// A `YYYY-MM-DD` day, as cut from the front of a stored UTC timestamp.
pub(crate) fn day(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| conversion(idx, e))
}

/// Parse one of the shared enums stored as text.
pub(crate) fn variant<T>(idx: usize, s: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = civic_shared::ParseError>,
{
    s.parse().map_err(|e| conversion(idx, e))
}
