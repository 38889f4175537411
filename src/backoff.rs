//! Exponential backoff for broker reconnects
//!
//! - First delay: `initial_delay`
//! - Following delays: `min(previous * multiplier, max_delay)`
//! - Each delay is jittered by ±25% so several devices behind one broker do
//!   not reconnect in lockstep
//! - [`Backoff::reset`] is called once the broker acknowledges a connection

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::time::Duration;

use crate::config::ReconnectConfig;

#[derive(Debug, Clone)]
pub struct Backoff {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    current: Duration,
}

impl Backoff {
    pub fn new(initial_delay: Duration, max_delay: Duration, multiplier: f32) -> Self {
        let initial_delay = initial_delay.min(max_delay);
        Self {
            initial_delay,
            max_delay,
            multiplier: f64::from(multiplier.max(1.0)),
            current: initial_delay,
        }
    }

    /// Delay to wait before the next attempt; advances the backoff.
    pub fn next_delay(&mut self) -> Duration {
        let delay = apply_jitter(self.current);
        let next = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max_delay);
        self.current = next.min(self.max_delay);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial_delay;
    }
}

impl From<&ReconnectConfig> for Backoff {
    fn from(config: &ReconnectConfig) -> Self {
        Backoff::new(
            Duration::from_millis(config.initial_delay),
            Duration::from_secs(config.max_delay),
            config.multiplier,
        )
    }
}

/// Multiply `delay` by a pseudo-random factor in `0.75..=1.25`.
fn apply_jitter(delay: Duration) -> Duration {
    let hash = RandomState::new().hash_one(std::time::SystemTime::now());
    let random_factor = (hash % 1000) as f64 / 1000.0;
    let jitter_multiplier = 0.75 + (random_factor * 0.5);

    Duration::try_from_secs_f64(delay.as_secs_f64() * jitter_multiplier).unwrap_or(delay)
}
