//! Stream client configuration.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Content type requested from the event feed.
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Configuration for a [`StreamClient`](crate::StreamClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// How long to wait after a connection ends (cleanly or not) before
    /// trying again. Default: 2 seconds.
    pub retry_delay: Duration,

    /// Random extra delay (0..=jitter) added to each retry, so that many
    /// clients dropped by the same server restart don't all come back in
    /// the same instant. Default: zero (fixed delay).
    pub retry_jitter: Duration,

    /// Value of the `Accept` header. Default: `text/event-stream`.
    pub accept: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            retry_delay: Self::DEFAULT_RETRY_DELAY,
            retry_jitter: Duration::ZERO,
            accept: EVENT_STREAM_CONTENT_TYPE.to_string(),
        }
    }
}

impl StreamConfig {
    /// Default pause between connection attempts.
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2000);

    /// Smallest retry delay accepted. Anything lower would turn a server
    /// that instantly closes connections into a busy loop.
    pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(10);

    /// Create a config with a specific retry delay and defaults otherwise.
    pub fn with_retry_delay(retry_delay: Duration) -> Self {
        Self {
            retry_delay,
            ..Default::default()
        }
    }

    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// Called automatically when a client is built. Rules:
    /// - `retry_delay` raised to at least [`Self::MIN_RETRY_DELAY`].
    /// - `retry_jitter` capped at `retry_delay`.
    /// - an empty `accept` falls back to `text/event-stream`.
    pub fn validated(mut self) -> Self {
        if self.retry_delay < Self::MIN_RETRY_DELAY {
            warn!(
                retry_ms = self.retry_delay.as_millis() as u64,
                min_ms = Self::MIN_RETRY_DELAY.as_millis() as u64,
                "retry_delay below minimum, clamping"
            );
            self.retry_delay = Self::MIN_RETRY_DELAY;
        }
        if self.retry_jitter > self.retry_delay {
            warn!(
                jitter_ms = self.retry_jitter.as_millis() as u64,
                "retry_jitter exceeds retry_delay, capping"
            );
            self.retry_jitter = self.retry_delay;
        }
        if self.accept.trim().is_empty() {
            self.accept = EVENT_STREAM_CONTENT_TYPE.to_string();
        }
        self
    }

    /// The delay before the next retry: `retry_delay` plus jitter.
    pub fn next_retry_delay(&self) -> Duration {
        if self.retry_jitter.is_zero() {
            return self.retry_delay;
        }
        let max_us = self.retry_jitter.as_micros().min(u64::MAX as u128) as u64;
        let extra = rand::rng().random_range(0..=max_us);
        self.retry_delay + Duration::from_micros(extra)
    }
}
