//! Timestamp helpers for Horizon payloads and record bookkeeping.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Format Horizon uses for `created_at` on operations.
pub const HORIZON_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Errors that can occur during timestamp parsing.
#[derive(Debug, Error)]
pub enum TimestampError {
    /// The timestamp string is empty.
    #[error("Empty timestamp string")]
    EmptyString,

    /// The timestamp value is invalid.
    #[error("Invalid timestamp: {0}")]
    InvalidFormat(String),
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Parses a Horizon `created_at` string.
///
/// Accepts the canonical `2019-04-16T19:51:54Z` form and falls back to
/// RFC 3339 for payloads carrying fractional seconds or offsets.
pub fn parse_horizon_timestamp(input: &str) -> Result<Timestamp, TimestampError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::EmptyString);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, HORIZON_DATETIME_FORMAT) {
        return Ok(naive.and_utc());
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimestampError::InvalidFormat(trimmed.to_string()))
}
