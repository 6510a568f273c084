//! Sliding-window request rate limiter.
//!
//! One instance per provider adapter, constructed and injected explicitly so
//! tests get isolated state and multiple deployments never share a window
//! through module globals. Timestamps older than the window are pruned on
//! every check; the attempt is recorded whether or not the vendor call
//! ultimately succeeds.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// True if another request fits in the current window.
    pub fn check(&self) -> bool {
        let now = Instant::now();
        let mut times = self.timestamps.lock();
        while times
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            times.pop_front();
        }
        times.len() < self.max_requests
    }

    /// Count an attempt against the window.
    pub fn record(&self) {
        self.timestamps.lock().push_back(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.check());
            limiter.record();
        }
        assert!(!limiter.check());
    }

    #[test]
    fn test_window_expiry_frees_budget() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check());
        limiter.record();
        assert!(!limiter.check());

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check());
    }

    #[test]
    fn test_check_does_not_consume() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check());
        assert!(limiter.check());
        limiter.record();
        assert!(!limiter.check());
    }
}
