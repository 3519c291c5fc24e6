//! Passphrase attempt limiting

use std::time::{Duration, Instant};

/// Windowed limiter for failed passphrase attempts.
///
/// Failed verifications are recorded; once `max_attempts` failures have
/// accumulated inside the window, further attempts are refused until the
/// oldest failure ages out.
#[derive(Debug)]
pub struct AttemptLimiter {
    failures: Vec<Instant>,
    max_attempts: usize,
    window: Duration,
}

impl AttemptLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            failures: Vec::new(),
            max_attempts,
            window,
        }
    }

    /// Check whether another attempt is currently allowed
    pub fn is_allowed(&mut self, now: Instant) -> bool {
        self.prune(now);
        self.failures.len() < self.max_attempts
    }

    /// Record a failed attempt
    pub fn record_failure(&mut self, now: Instant) {
        self.prune(now);
        self.failures.push(now);
    }

    /// Time until the next attempt is allowed, `None` if allowed now
    pub fn retry_after(&mut self, now: Instant) -> Option<Duration> {
        self.prune(now);
        if self.failures.len() < self.max_attempts {
            return None;
        }

        let oldest = *self.failures.first()?;
        let elapsed = now.duration_since(oldest);
        (elapsed < self.window).then(|| self.window - elapsed)
    }

    /// Clear all recorded failures (e.g. after a successful verification)
    pub fn reset(&mut self) {
        self.failures.clear();
    }

    fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.failures
            .retain(|&at| now.duration_since(at) < window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_until_limit() {
        let mut limiter = AttemptLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.is_allowed(now));
            limiter.record_failure(now);
        }

        assert!(!limiter.is_allowed(now));
        assert!(limiter.retry_after(now).is_some());
    }

    #[test]
    fn window_expiry_frees_attempts() {
        let mut limiter = AttemptLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();

        limiter.record_failure(now);
        limiter.record_failure(now);
        assert!(!limiter.is_allowed(now));

        let later = now + Duration::from_secs(61);
        assert!(limiter.is_allowed(later));
        assert!(limiter.retry_after(later).is_none());
    }

    #[test]
    fn reset_clears_failures() {
        let mut limiter = AttemptLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        limiter.record_failure(now);
        assert!(!limiter.is_allowed(now));

        limiter.reset();
        assert!(limiter.is_allowed(now));
    }
}
