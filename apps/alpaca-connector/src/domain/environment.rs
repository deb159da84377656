//! Trading environment (paper vs live).

use std::fmt;

/// Which Alpaca account the credentials belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Paper trading (simulated).
    #[default]
    Paper,
    /// Live trading (real money).
    Live,
}

impl Environment {
    /// Infer the environment from the trading API base URL.
    ///
    /// Any URL containing `paper` is the paper environment.
    #[must_use]
    pub fn from_base_url(base_url: &str) -> Self {
        if base_url.to_ascii_lowercase().contains("paper") {
            Self::Paper
        } else {
            Self::Live
        }
    }

    /// Check if this is live trading.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Paper => "paper",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paper => write!(f, "PAPER"),
            Self::Live => write!(f, "LIVE"),
        }
    }
}
