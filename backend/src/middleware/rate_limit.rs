use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// In-memory sliding-window limiter for failed admin logins
pub struct RateLimiter {
    /// Client key to timestamps of failed attempts
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
    max_attempts: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window_secs: u64) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            max_attempts,
            window: Duration::from_secs(window_secs),
        }
    }

    fn attempts(&self) -> MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True while the key is still allowed to try
    pub fn check(&self, key: &str) -> bool {
        let mut attempts = self.attempts();
        let now = Instant::now();

        match attempts.get_mut(key) {
            Some(entry) => {
                entry.retain(|&time| now.duration_since(time) < self.window);
                entry.len() < self.max_attempts
            }
            None => true,
        }
    }

    /// Record a failed attempt
    pub fn record(&self, key: &str) {
        let mut attempts = self.attempts();
        let now = Instant::now();

        let entry = attempts.entry(key.to_string()).or_default();
        entry.retain(|&time| now.duration_since(time) < self.window);
        entry.push(now);
    }

    /// Forget the key, e.g. after a successful login
    pub fn clear(&self, key: &str) {
        self.attempts().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_allows_until_limit() {
        let limiter = RateLimiter::new(3, 60);

        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1"));
            limiter.record("10.0.0.1");
        }
        assert!(!limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
    }

    #[test]
    fn test_window_expires() {
        let limiter = RateLimiter::new(1, 1);

        limiter.record("10.0.0.1");
        assert!(!limiter.check("10.0.0.1"));

        sleep(Duration::from_millis(1100));
        assert!(limiter.check("10.0.0.1"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, 60);

        limiter.record("10.0.0.1");
        assert!(!limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
        limiter.record("10.0.0.2");
        assert!(!limiter.check("10.0.0.2"));
    }

    #[test]
    fn test_clear_after_success() {
        let limiter = RateLimiter::new(2, 60);

        limiter.record("10.0.0.1");
        limiter.record("10.0.0.1");
        limiter.clear("10.0.0.1");

        assert!(limiter.check("10.0.0.1"));
        limiter.record("10.0.0.1");
        assert!(limiter.check("10.0.0.1"));
    }
}
