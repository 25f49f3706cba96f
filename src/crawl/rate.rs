// src/crawl/rate.rs
// =============================================================================
// Polite crawling: the orchestrator waits here once per loop iteration.
//
// Instead of a bare sleep we keep a tokio Interval. The first tick fires one
// full delay after creation, and if an iteration runs long we simply start
// counting again from there rather than bursting to catch up. Because it is
// driven by tokio's clock, tests can pause time and skip through the waits.
// =============================================================================

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

pub struct RateLimiter {
    interval: Option<Interval>,
}

impl RateLimiter {
    // A zero delay turns the limiter into a no-op
    //
    // Must be created from inside the tokio runtime.
    pub fn new(delay: Duration) -> Self {
        if delay.is_zero() {
            return Self { interval: None };
        }
        let mut interval = interval_at(Instant::now() + delay, delay);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval: Some(interval),
        }
    }

    pub async fn wait(&mut self) {
        if let Some(interval) = self.interval.as_mut() {
            interval.tick().await;
        }
    }
}
