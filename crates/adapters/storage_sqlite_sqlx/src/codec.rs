//! Column encodings shared by the repositories.

use std::str::FromStr;

use chrono::SecondsFormat;
use hearth_domain::time::{Date, Timestamp};
use serde::de::DeserializeOwned;

pub(crate) fn decode_error(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

/// Fixed-width so that string comparison in SQL orders by time.
pub(crate) fn timestamp(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.to_utc())
        .map_err(decode_error)
}

pub(crate) fn parse_optional_timestamp(raw: Option<String>) -> Result<Option<Timestamp>, sqlx::Error> {
    raw.as_deref().map(parse_timestamp).transpose()
}

pub(crate) fn date(date: Date) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(raw: &str) -> Result<Date, sqlx::Error> {
    Date::from_str(raw).map_err(decode_error)
}

pub(crate) fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw).map_err(decode_error)
}

/// SQLite treats a negative `LIMIT` as unbounded.
pub(crate) fn limit(limit: Option<u32>) -> i64 {
    limit.map_or(-1, i64::from)
}
