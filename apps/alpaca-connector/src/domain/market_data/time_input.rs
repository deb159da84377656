//! Caller-facing time bounds: native `chrono` values or ISO-8601 strings.
//!
//! Strings accept RFC 3339 (a trailing `Z` means UTC), naive date-times (taken
//! as UTC) and bare dates (midnight UTC).

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::ProviderError;

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A point in time supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeInput {
    /// Absolute UTC instant.
    At(DateTime<Utc>),
    /// ISO-8601 text, parsed on use.
    Iso(String),
}

impl TimeInput {
    /// Resolve to a UTC instant.
    pub fn resolve(&self) -> Result<DateTime<Utc>, ProviderError> {
        match self {
            Self::At(at) => Ok(*at),
            Self::Iso(text) => parse_instant(text),
        }
    }
}

impl From<DateTime<Utc>> for TimeInput {
    fn from(at: DateTime<Utc>) -> Self {
        Self::At(at)
    }
}

impl From<NaiveDate> for TimeInput {
    fn from(date: NaiveDate) -> Self {
        Self::At(date.and_time(NaiveTime::MIN).and_utc())
    }
}

impl From<&str> for TimeInput {
    fn from(text: &str) -> Self {
        Self::Iso(text.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(text: String) -> Self {
        Self::Iso(text)
    }
}

/// A calendar date supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    /// Calendar date.
    Date(NaiveDate),
    /// Date-only or full ISO-8601 text; only the date part is kept.
    Iso(String),
}

impl DateInput {
    /// Resolve to a calendar date.
    ///
    /// Full timestamps keep the date as written in their own offset.
    pub fn resolve(&self) -> Result<NaiveDate, ProviderError> {
        match self {
            Self::Date(date) => Ok(*date),
            Self::Iso(text) => parse_date(text),
        }
    }
}

impl From<NaiveDate> for DateInput {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl From<&str> for DateInput {
    fn from(text: &str) -> Self {
        Self::Iso(text.to_string())
    }
}

impl From<String> for DateInput {
    fn from(text: String) -> Self {
        Self::Iso(text)
    }
}

/// Parse ISO-8601 text into a UTC instant.
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>, ProviderError> {
    let trimmed = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Some(naive) = parse_naive_datetime(trimmed) {
        return Ok(naive.and_utc());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| ProviderError::InvalidInput(format!("unparseable timestamp: {text}")))
}

/// Parse ISO-8601 text into a calendar date.
pub fn parse_date(text: &str) -> Result<NaiveDate, ProviderError> {
    let trimmed = text.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.date_naive());
    }

    parse_naive_datetime(trimmed)
        .map(|naive| naive.date())
        .ok_or_else(|| ProviderError::InvalidInput(format!("unparseable date: {text}")))
}

fn parse_naive_datetime(text: &str) -> Option<NaiveDateTime> {
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}
