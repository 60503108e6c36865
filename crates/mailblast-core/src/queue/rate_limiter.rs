//! Start-Rate Limiter - caps job starts per time window

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window limiter on job starts. Bounds how many jobs the worker
/// pool may start inside one window, independent of how many run
/// concurrently.
pub struct StartRateLimiter {
    max: usize,
    window: Duration,
    starts: Mutex<VecDeque<Instant>>,
}

impl StartRateLimiter {
    /// Create a limiter allowing `max` starts per `window`
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            max,
            window,
            starts: Mutex::new(VecDeque::new()),
        }
    }

    /// Record a start if the window has capacity
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut starts = self.starts.lock().unwrap_or_else(|e| e.into_inner());

        while starts
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            starts.pop_front();
        }

        if starts.len() < self.max {
            starts.push_back(now);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_max_per_window() {
        let limiter = StartRateLimiter::new(3, Duration::from_secs(60));

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_window_expiry_frees_capacity() {
        let limiter = StartRateLimiter::new(1, Duration::from_millis(20));

        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.try_acquire());
    }
}
