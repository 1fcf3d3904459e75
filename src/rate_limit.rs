//! Fixed-window request limiting for the HTTP layer.
//!
//! Each key (client ip + route) gets `limit` requests per window. A window
//! opens on the first request after the previous one expired, so bursts at a
//! window boundary can briefly see up to twice the limit.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: i64,
    count: u32,
}

/// Counter store owned by the router; never shared with the pipeline.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    limit: u32,
    window_secs: i64,
    counters: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window_secs: i64) -> Self {
        Self {
            limit,
            window_secs,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request for `key` at the current time.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, chrono::Utc::now().timestamp())
    }

    /// Record a request for `key` at unix time `now`. Returns `false` when
    /// the key has exhausted its window.
    pub fn check_at(&self, key: &str, now: i64) -> bool {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let window = counters
            .entry(key.to_string())
            .or_insert(Window { started: now, count: 0 });

        let allowed = if now - window.started > self.window_secs {
            *window = Window { started: now, count: 1 };
            true
        } else if window.count >= self.limit {
            false
        } else {
            window.count += 1;
            true
        };

        let window_secs = self.window_secs;
        counters.retain(|_, w| now - w.started <= window_secs);

        allowed
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = FixedWindowLimiter::new(3, 60);
        assert!(limiter.check_at("1.2.3.4:/chat", 100));
        assert!(limiter.check_at("1.2.3.4:/chat", 101));
        assert!(limiter.check_at("1.2.3.4:/chat", 102));
        assert!(!limiter.check_at("1.2.3.4:/chat", 103));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, 60);
        assert!(limiter.check_at("1.2.3.4:/chat", 100));
        assert!(limiter.check_at("5.6.7.8:/chat", 100));
        assert!(limiter.check_at("1.2.3.4:/other", 100));
        assert!(!limiter.check_at("1.2.3.4:/chat", 100));
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let limiter = FixedWindowLimiter::new(1, 60);
        assert!(limiter.check_at("k", 100));
        assert!(!limiter.check_at("k", 160));
        assert!(limiter.check_at("k", 161));
    }

    #[test]
    fn test_expired_entries_are_purged() {
        let limiter = FixedWindowLimiter::new(5, 60);
        limiter.check_at("old", 0);
        limiter.check_at("new", 100);
        assert_eq!(limiter.tracked(), 1);
    }
}
