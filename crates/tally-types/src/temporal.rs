//! Clock and identifier generation.
//!
//! Timestamps are UTC wall-clock values that never move backwards within
//! one [`MonotonicClock`]. Identifiers are UUID v7 strings, which sort by
//! creation time and need no coordination to stay unique.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::RngCore;

use crate::error::TypeError;

/// Wall clock that never returns a value earlier than its previous reading.
#[derive(Clone, Debug, Default)]
pub struct MonotonicClock {
    last: Option<DateTime<Utc>>,
}

impl MonotonicClock {
    /// Create a clock with no prior readings.
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Read the current time, clamped so readings are non-decreasing.
    pub fn now(&mut self) -> DateTime<Utc> {
        self.advance_to(Utc::now())
    }

    /// Feed an explicit wall-clock reading through the clamp.
    ///
    /// Returns `wall` unless it is earlier than the previous reading, in which
    /// case the previous reading is returned again.
    pub fn advance_to(&mut self, wall: DateTime<Utc>) -> DateTime<Utc> {
        let next = match self.last {
            Some(prev) if prev > wall => prev,
            _ => wall,
        };
        self.last = Some(next);
        next
    }

    /// The most recent reading, if any.
    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.last
    }
}

/// Generate a fresh time-ordered identifier (UUID v7, hyphenated).
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Generate a single-use nonce: 32 random bytes, hex encoded.
pub fn new_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Canonical text form of a timestamp: RFC 3339, nanosecond precision, `Z` suffix.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TypeError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| TypeError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}
