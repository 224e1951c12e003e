//! Timestamp parsing and canonical text form.
//!
//! Comparisons that need an absolute instant go through [`parse_instant`].
//! Fields that are ordered lexically (audit `occurred_at`) carry a
//! [`CanonicalTimestamp`], whose fixed UTC millisecond layout makes byte
//! order and chronological order coincide.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Source-system layout (`2024-03-01 12:00:00`, optional fraction), read as UTC.
const SOURCE_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Error raised when a timestamp cannot be read as an absolute instant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// The text is neither RFC 3339 nor the source-system layout.
    #[error("malformed timestamp for {field}: '{value}'")]
    Malformed {
        /// Field that held the timestamp.
        field: &'static str,
        /// Offending text.
        value: String,
    },
    /// The instant has no four-digit canonical form.
    #[error("timestamp for {field} is outside years 0000-9999: '{value}'")]
    OutOfRange {
        /// Field that held the timestamp.
        field: &'static str,
        /// Offending text.
        value: String,
    },
}

/// Parses `value` as an absolute instant.
///
/// Accepts RFC 3339 with any offset, or `YYYY-MM-DD HH:MM:SS[.fff]` which is
/// taken to be UTC.
pub fn parse_instant(field: &'static str, value: &str) -> Result<DateTime<Utc>, TimestampError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, SOURCE_LAYOUT)
        .map(|naive| naive.and_utc())
        .map_err(|_| TimestampError::Malformed {
            field,
            value: value.to_string(),
        })
}

/// UTC timestamp with exactly millisecond precision and a `Z` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalTimestamp(String);

impl CanonicalTimestamp {
    /// Accepts text that is already canonical, without reformatting.
    pub fn parse(value: impl Into<String>) -> Result<Self, TimestampError> {
        let s = value.into();
        let re = Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z$").expect("invalid regex");
        if !re.is_match(&s) || DateTime::parse_from_rfc3339(&s).is_err() {
            return Err(TimestampError::Malformed {
                field: "canonical_timestamp",
                value: s,
            });
        }
        Ok(Self(s))
    }

    /// Converts any accepted timestamp into canonical form.
    ///
    /// Precision beyond milliseconds is truncated.
    pub fn canonicalize(field: &'static str, value: &str) -> Result<Self, TimestampError> {
        let instant = parse_instant(field, value)?;
        Self::from_instant(instant).map_err(|_| TimestampError::OutOfRange {
            field,
            value: value.to_string(),
        })
    }

    /// Formats an instant. Years must be in `0000..=9999` so that the text
    /// stays fixed-width and sorts chronologically.
    pub fn from_instant(instant: DateTime<Utc>) -> Result<Self, TimestampError> {
        if !(0..=9999).contains(&instant.year()) {
            return Err(TimestampError::OutOfRange {
                field: "canonical_timestamp",
                value: instant.to_rfc3339(),
            });
        }
        Ok(Self(instant.to_rfc3339_opts(SecondsFormat::Millis, true)))
    }

    /// Returns the canonical text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CanonicalTimestamp {
    type Error = TimestampError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CanonicalTimestamp> for String {
    fn from(value: CanonicalTimestamp) -> Self {
        value.0
    }
}

impl fmt::Display for CanonicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}
