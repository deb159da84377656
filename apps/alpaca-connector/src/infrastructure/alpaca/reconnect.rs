//! Reconnection Policy
//!
//! Exponential backoff with jitter between stream reconnection attempts.

use std::time::Duration;

use rand::Rng;

use crate::infrastructure::config::WebSocketSettings;

/// Reconnection behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay.
    pub max_delay: Duration,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = ±10%).
    pub jitter_factor: f64,
    /// Attempts before giving up (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self::from(&WebSocketSettings::default())
    }
}

impl From<&WebSocketSettings> for ReconnectConfig {
    fn from(settings: &WebSocketSettings) -> Self {
        Self {
            initial_delay: settings.reconnect_delay_initial,
            max_delay: settings.reconnect_delay_max,
            multiplier: settings.reconnect_delay_multiplier,
            jitter_factor: 0.1,
            max_attempts: settings.max_reconnect_attempts,
        }
    }
}

/// Stateful backoff calculator for one stream worker.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    current_delay: Duration,
    attempt_count: u32,
}

impl ReconnectPolicy {
    /// Create a policy at its initial delay.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        let initial_delay = config.initial_delay;
        Self {
            config,
            current_delay: initial_delay,
            attempt_count: 0,
        }
    }

    /// Delay before the next attempt, or `None` once attempts are exhausted.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts > 0 && self.attempt_count >= self.config.max_attempts {
            return None;
        }

        self.attempt_count += 1;
        let delay = self.apply_jitter(self.current_delay);

        let next = self.current_delay.as_secs_f64() * self.config.multiplier;
        let capped = if next.is_finite() && next > 0.0 {
            next.min(self.config.max_delay.as_secs_f64())
        } else {
            self.config.max_delay.as_secs_f64()
        };
        self.current_delay = Duration::from_secs_f64(capped);

        Some(delay)
    }

    /// Reset after a connection authenticates.
    pub const fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.attempt_count = 0;
    }

    /// Attempts made since the last reset.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return duration;
        }

        let base = duration.as_secs_f64();
        let range = base * self.config.jitter_factor;
        let jitter: f64 = rand::rng().random_range(-range..=range);
        Duration::from_secs_f64((base + jitter).max(0.001))
    }
}
