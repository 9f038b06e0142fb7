//! Reconnect delay schedule.

use crate::config::BackoffConfig;
use rand::Rng;
use std::time::Duration;

/// Capped exponential backoff with equal jitter.
///
/// The n-th delay is `initial * multiplier^n`, capped at `max`. With jitter
/// enabled the upper half of that delay is drawn uniformly at random, so
/// clients dropped together do not reconnect in lockstep.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: bool,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.initial_ms),
            max: Duration::from_millis(config.max_ms),
            multiplier: config.multiplier,
            jitter: config.jitter,
            attempt: 0,
        }
    }

    /// Consecutive failures since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next attempt; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let exponent = self.attempt.min(64) as i32;
        let ceiling = (self.initial.as_secs_f64() * self.multiplier.powi(exponent))
            .min(self.max.as_secs_f64());
        self.attempt = self.attempt.saturating_add(1);

        if !self.jitter {
            return Duration::from_secs_f64(ceiling);
        }

        let half = ceiling / 2.0;
        Duration::from_secs_f64(half + rand::thread_rng().gen_range(0.0..=half))
    }

    /// Start over from the initial delay.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
