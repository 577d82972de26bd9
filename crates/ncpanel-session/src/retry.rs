//! Reconnect timing

use std::time::Duration;
use tokio::time::Instant;

/// Fixed-delay retry bookkeeping, reset on every successful connect
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delay: Duration,
    attempts: u32,
    last_attempt: Option<Instant>,
    last_failure: Option<Instant>,
}

impl RetryPolicy {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            attempts: 0,
            last_attempt: None,
            last_failure: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Discovery and connection attempts since the last successful connect
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    pub fn record_attempt(&mut self, now: Instant) {
        self.attempts += 1;
        self.last_attempt = Some(now);
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.last_failure = Some(now);
    }

    pub fn record_success(&mut self) {
        self.attempts = 0;
        self.last_failure = None;
    }

    /// Earliest instant the next attempt may start: one full delay after
    /// both the last failure and the last attempt.
    pub fn ready_at(&self, now: Instant) -> Instant {
        [self.last_failure, self.last_attempt]
            .into_iter()
            .flatten()
            .map(|t| t + self.delay)
            .max()
            .unwrap_or(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_immediately_without_history() {
        let policy = RetryPolicy::new(Duration::from_secs(5));
        let now = Instant::now();
        assert_eq!(policy.ready_at(now), now);
    }

    #[test]
    fn test_waits_a_full_delay_after_failure() {
        let mut policy = RetryPolicy::new(Duration::from_secs(5));
        let t0 = Instant::now();
        policy.record_attempt(t0);
        policy.record_failure(t0 + Duration::from_secs(30));

        assert_eq!(policy.ready_at(t0), t0 + Duration::from_secs(35));
        assert_eq!(policy.attempts(), 1);
    }

    #[test]
    fn test_attempts_are_spaced_even_when_failure_is_instant() {
        let mut policy = RetryPolicy::new(Duration::from_secs(5));
        let t0 = Instant::now();
        policy.record_attempt(t0);
        policy.record_failure(t0);
        assert_eq!(policy.ready_at(t0), t0 + Duration::from_secs(5));
    }

    #[test]
    fn test_success_resets_counter() {
        let mut policy = RetryPolicy::new(Duration::from_secs(5));
        let t0 = Instant::now();
        policy.record_attempt(t0);
        policy.record_attempt(t0);
        policy.record_success();
        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.last_attempt(), Some(t0));
    }
}
