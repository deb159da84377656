//! Bar aggregation timeframe in Alpaca notation (`1Min`, `15Min`, `1Hour`, `1Day`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unit of a bar timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeframeUnit {
    /// Minutes (1-59).
    Minute,
    /// Hours (1-23).
    Hour,
    /// Days (1 only).
    Day,
    /// Weeks (1 only).
    Week,
    /// Months (1, 2, 3, 4, 6, 12).
    Month,
}

impl TimeframeUnit {
    const fn suffix(self) -> &'static str {
        match self {
            Self::Minute => "Min",
            Self::Hour => "Hour",
            Self::Day => "Day",
            Self::Week => "Week",
            Self::Month => "Month",
        }
    }

    const fn accepts(self, amount: u32) -> bool {
        match self {
            Self::Minute => amount >= 1 && amount <= 59,
            Self::Hour => amount >= 1 && amount <= 23,
            Self::Day | Self::Week => amount == 1,
            Self::Month => matches!(amount, 1 | 2 | 3 | 4 | 6 | 12),
        }
    }
}

/// Bar aggregation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeframe {
    amount: u32,
    unit: TimeframeUnit,
}

impl Timeframe {
    /// One-minute bars, the base streaming granularity.
    pub const MINUTE: Self = Self {
        amount: 1,
        unit: TimeframeUnit::Minute,
    };

    /// One-hour bars.
    pub const HOUR: Self = Self {
        amount: 1,
        unit: TimeframeUnit::Hour,
    };

    /// Daily bars.
    pub const DAY: Self = Self {
        amount: 1,
        unit: TimeframeUnit::Day,
    };

    /// Build a timeframe, rejecting amounts Alpaca does not serve.
    pub fn new(amount: u32, unit: TimeframeUnit) -> Result<Self, TimeframeError> {
        if unit.accepts(amount) {
            Ok(Self { amount, unit })
        } else {
            Err(TimeframeError(format!("{amount}{}", unit.suffix())))
        }
    }

    /// Number of units per bar.
    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.amount
    }

    /// Unit of the timeframe.
    #[must_use]
    pub const fn unit(&self) -> TimeframeUnit {
        self.unit
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::MINUTE
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

/// Unrecognised timeframe label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported timeframe: {0}")]
pub struct TimeframeError(String);

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, suffix) = trimmed.split_at(split);

        let amount = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| TimeframeError(s.to_string()))?
        };

        let unit = match suffix.to_ascii_lowercase().as_str() {
            "min" | "t" => TimeframeUnit::Minute,
            "hour" | "h" => TimeframeUnit::Hour,
            "day" | "d" => TimeframeUnit::Day,
            "week" | "w" => TimeframeUnit::Week,
            "month" | "m" => TimeframeUnit::Month,
            _ => return Err(TimeframeError(s.to_string())),
        };

        Self::new(amount, unit).map_err(|_| TimeframeError(s.to_string()))
    }
}

impl Serialize for Timeframe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timeframe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1Min", Timeframe::MINUTE ; "one minute")]
    #[test_case("1Hour", Timeframe::HOUR ; "one hour")]
    #[test_case("1Day", Timeframe::DAY ; "one day")]
    #[test_case("1day", Timeframe::DAY ; "lowercase")]
    #[test_case("Day", Timeframe::DAY ; "implicit amount")]
    fn parses_alpaca_labels(label: &str, expected: Timeframe) {
        assert_eq!(label.parse::<Timeframe>().unwrap(), expected);
    }

    #[test]
    fn round_trips_display() {
        let tf: Timeframe = "15Min".parse().unwrap();
        assert_eq!(tf.to_string(), "15Min");
        assert_eq!(tf.amount(), 15);
        assert_eq!(tf.unit(), TimeframeUnit::Minute);
    }

    #[test_case("60Min" ; "minutes out of range")]
    #[test_case("2Day" ; "multi day")]
    #[test_case("5Month" ; "unsupported month")]
    #[test_case("1Fortnight" ; "unknown unit")]
    #[test_case("" ; "empty")]
    fn rejects_unsupported(label: &str) {
        assert!(label.parse::<Timeframe>().is_err());
    }

    #[test]
    fn default_is_minute() {
        assert_eq!(Timeframe::default().to_string(), "1Min");
    }
}
