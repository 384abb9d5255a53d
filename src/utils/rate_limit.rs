// src/utils/rate_limit.rs

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

/// Outcome of a single rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub success: bool,
    /// Requests left in the current window after this check.
    pub remaining: u32,
    /// Unix epoch milliseconds at which the current window ends.
    pub reset_at: i64,
}

/// Fixed-window in-memory rate limiter keyed by caller-supplied strings.
///
/// Intentionally best-effort and non-durable: counters live in process
/// memory only and are lost on restart. Constructed once in `AppState`;
/// `reset` exists so tests can start from a clean slate.
pub struct RateLimiter {
    limit: u32,
    window_ms: i64,
    windows: Mutex<HashMap<String, (i64, u32)>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window_ms: i64) -> Self {
        Self {
            limit,
            window_ms: window_ms.max(1),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Utc::now().timestamp_millis())
    }

    fn check_at(&self, key: &str, now_ms: i64) -> RateDecision {
        let window_start = now_ms - now_ms.rem_euclid(self.window_ms);
        let reset_at = window_start + self.window_ms;

        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let entry = windows.entry(key.to_string()).or_insert((window_start, 0));

        if entry.0 != window_start {
            *entry = (window_start, 0);
        }

        if entry.1 >= self.limit {
            return RateDecision {
                success: false,
                remaining: 0,
                reset_at,
            };
        }

        entry.1 += 1;
        RateDecision {
            success: true,
            remaining: self.limit - entry.1,
            reset_at,
        }
    }

    /// Drop all counters. Test hook.
    pub fn reset(&self) {
        self.windows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_within_window() {
        let limiter = RateLimiter::new(3, 1_000);
        let now = 10_000;

        for expected_remaining in [2, 1, 0] {
            let d = limiter.check_at("k", now);
            assert!(d.success);
            assert_eq!(d.remaining, expected_remaining);
            assert_eq!(d.reset_at, 11_000);
        }

        let d = limiter.check_at("k", now + 999);
        assert!(!d.success);
        assert_eq!(d.remaining, 0);
    }

    #[test]
    fn window_rollover_resets_count() {
        let limiter = RateLimiter::new(1, 1_000);
        assert!(limiter.check_at("k", 10_000).success);
        assert!(!limiter.check_at("k", 10_500).success);
        assert!(limiter.check_at("k", 11_000).success);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, 1_000);
        assert!(limiter.check_at("a", 0).success);
        assert!(limiter.check_at("b", 0).success);
        assert!(!limiter.check_at("a", 1).success);
    }

    #[test]
    fn reset_clears_all_counters() {
        let limiter = RateLimiter::new(1, 1_000);
        assert!(limiter.check_at("k", 0).success);
        limiter.reset();
        assert!(limiter.check_at("k", 1).success);
    }
}
