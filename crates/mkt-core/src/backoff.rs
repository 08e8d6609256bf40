//! Exponential retry delays with jitter.
//!
//! The delay doubles on every attempt from `initial` up to `max`, then each
//! returned value is scaled by a random factor in `[1 - jitter, 1 + jitter]`
//! so that many relays reconnecting at once do not retry in lockstep.

use std::time::Duration;

use rand::Rng;

use crate::config::BackoffConfig;

/// Retry delay generator. Not thread-safe; each loop owns its own.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    jitter: f64,
    current: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, jitter: f64) -> Self {
        Self {
            initial,
            max: max.max(initial),
            jitter: jitter.clamp(0.0, 1.0),
            current: initial,
            attempts: 0,
        }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(config.initial(), config.max(), config.jitter)
    }

    /// Delay to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.current = (self.current * 2).min(self.max);
        self.attempts = self.attempts.saturating_add(1);

        if self.jitter == 0.0 {
            return base;
        }
        let factor = rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter);
        base.mul_f64(factor)
    }

    /// Back to `initial`; call after a successful attempt.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.attempts = 0;
    }

    /// Attempts since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&BackoffConfig::default())
    }
}
