//! Time sources
//!
//! Interval and backoff timing goes through tokio's clock so tests can pause
//! it; the wall-clock second used for the indicator blink goes through
//! [`Clock::unix_seconds`] so renderers can be driven deterministically.

use std::sync::atomic::{AtomicI64, Ordering};
use tokio::time::Instant;

pub trait Clock: Send + Sync {
    /// Monotonic instant on tokio's timeline
    fn now(&self) -> Instant;
    /// Current wall-clock time in whole seconds since the Unix epoch
    fn unix_seconds(&self) -> i64;
}

/// Real time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_seconds(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock whose wall-clock second is set by hand
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: AtomicI64,
}

impl ManualClock {
    pub fn new(seconds: i64) -> Self {
        Self {
            seconds: AtomicI64::new(seconds),
        }
    }

    pub fn set(&self, seconds: i64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_seconds(&self) -> i64 {
        self.seconds.load(Ordering::SeqCst)
    }
}
