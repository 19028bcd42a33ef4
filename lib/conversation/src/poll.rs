//! Run polling cadence.

use crate::error::ConversationError;
use serde::Deserialize;
use std::time::Duration;

/// Longest a chat turn may be configured to wait on its run.
pub const MAX_WAIT_SECONDS_LIMIT: u64 = 3_600;
/// Largest accepted backoff growth factor.
pub const MAX_MULTIPLIER: f64 = 10.0;

/// How the chat loop waits on a run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// First delay between polls.
    pub initial_interval_ms: u64,
    /// Upper bound on the delay between polls.
    pub max_interval_ms: u64,
    /// Growth factor applied after every poll that saw no progress.
    pub multiplier: f64,
    /// Total time a single chat turn may wait on its run.
    pub max_wait_seconds: u64,
    /// How many `requires_action` rounds a single run may go through.
    pub max_tool_rounds: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 100,
            max_interval_ms: 2_000,
            multiplier: 2.0,
            max_wait_seconds: 120,
            max_tool_rounds: 8,
        }
    }
}

impl PollConfig {
    /// Checks the values are usable as timer inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the multiplier is not a finite number in
    /// `1.0..=10.0`, an interval is zero or longer than the wait, or the wait
    /// exceeds [`MAX_WAIT_SECONDS_LIMIT`].
    pub fn validate(&self) -> Result<(), ConversationError> {
        let invalid = |reason: String| Err(ConversationError::InvalidConfig { reason });
        if !self.multiplier.is_finite() || !(1.0..=MAX_MULTIPLIER).contains(&self.multiplier) {
            return invalid(format!(
                "poll.multiplier must be between 1 and {MAX_MULTIPLIER}, got {}",
                self.multiplier
            ));
        }
        if self.max_wait_seconds == 0 || self.max_wait_seconds > MAX_WAIT_SECONDS_LIMIT {
            return invalid(format!(
                "poll.max_wait_seconds must be between 1 and {MAX_WAIT_SECONDS_LIMIT}, got {}",
                self.max_wait_seconds
            ));
        }
        let max_wait_ms = self.max_wait_seconds * 1_000;
        for (name, value) in [
            ("initial_interval_ms", self.initial_interval_ms),
            ("max_interval_ms", self.max_interval_ms),
        ] {
            if value == 0 || value > max_wait_ms {
                return invalid(format!(
                    "poll.{name} must be between 1 and {max_wait_ms}, got {value}"
                ));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    #[must_use]
    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms.max(self.initial_interval_ms))
    }

    /// Total wait per turn, capped at [`MAX_WAIT_SECONDS_LIMIT`].
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_seconds.min(MAX_WAIT_SECONDS_LIMIT))
    }

    /// Starts a fresh backoff sequence.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self)
    }
}

/// Exponential backoff between run polls.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current: Duration,
}

impl Backoff {
    fn new(config: &PollConfig) -> Self {
        let initial = config.initial_interval();
        Self {
            initial,
            max: config.max_interval(),
            // A multiplier below 1 would shrink the interval forever.
            multiplier: config.multiplier.max(1.0),
            current: initial,
        }
    }

    /// Returns the delay before the next poll and grows the one after it.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.multiplier)
            .map_or(self.max, |next| next.min(self.max));
        delay
    }

    /// Goes back to the initial interval, after the run made progress.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_to_cap() {
        let config = PollConfig {
            initial_interval_ms: 100,
            max_interval_ms: 500,
            multiplier: 2.0,
            ..PollConfig::default()
        };
        let mut backoff = config.backoff();
        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
    }

    #[test]
    fn reset_restarts_sequence() {
        let mut backoff = PollConfig::default().backoff();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn shrinking_multiplier_is_clamped() {
        let config = PollConfig {
            multiplier: 0.5,
            ..PollConfig::default()
        };
        let mut backoff = config.backoff();
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn unbounded_multiplier_saturates_at_cap() {
        let config = PollConfig {
            multiplier: f64::INFINITY,
            ..PollConfig::default()
        };
        let mut backoff = config.backoff();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(2_000));
    }

    #[test]
    fn huge_wait_is_capped() {
        let config = PollConfig {
            max_wait_seconds: u64::MAX,
            ..PollConfig::default()
        };
        assert_eq!(config.max_wait(), Duration::from_secs(MAX_WAIT_SECONDS_LIMIT));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(PollConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_unusable_values() {
        let cases = [
            PollConfig {
                multiplier: f64::INFINITY,
                ..PollConfig::default()
            },
            PollConfig {
                multiplier: f64::NAN,
                ..PollConfig::default()
            },
            PollConfig {
                multiplier: 0.5,
                ..PollConfig::default()
            },
            PollConfig {
                max_wait_seconds: u64::MAX,
                ..PollConfig::default()
            },
            PollConfig {
                max_wait_seconds: 0,
                ..PollConfig::default()
            },
            PollConfig {
                initial_interval_ms: 0,
                ..PollConfig::default()
            },
            PollConfig {
                max_interval_ms: u64::MAX,
                ..PollConfig::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(ConversationError::InvalidConfig { .. })),
                "{config:?}"
            );
        }
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: PollConfig =
            serde_json::from_value(serde_json::json!({"max_wait_seconds": 5})).unwrap();
        assert_eq!(config.max_wait(), Duration::from_secs(5));
        assert_eq!(config.max_tool_rounds, 8);
    }
}
