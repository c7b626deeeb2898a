//! Fixed-window request rate limiting (§4.A).
//!
//! One window per client key (caller supplies the key — typically a source IP).
//! `dashmap` gives us per-key sharded locking for free, the same tradeoff
//! `casparian_sentinel::Sentinel` makes with its `Arc<Mutex<HashMap<...>>>` job table, but
//! sharded instead of a single lock since this map is on the hot path of every request.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Outcome of a `RateLimiter::check_and_increment` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: DateTime<Utc>,
}

impl Window {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            started_at: now,
        }
    }
}

/// Sharded fixed-window limiter: `max_requests` per `window` per key.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: DashMap::new(),
        }
    }

    /// Check-and-increment is atomic per key: the read-modify-write happens under the
    /// shard's entry lock, so two concurrent requests for the same key never both see
    /// `remaining == 1` and both get allowed (§8 invariant: rate limit is exact, not
    /// approximate).
    pub fn check_and_increment(&self, key: &str, now: DateTime<Utc>) -> Status {
        let window_duration = chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::zero());
        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window::fresh(now));

        if now - entry.started_at >= window_duration {
            *entry = Window::fresh(now);
        }

        if entry.count >= self.max_requests {
            let reset_at = entry.started_at + window_duration;
            let retry_after = (reset_at - now).to_std().unwrap_or(Duration::ZERO);
            return Status::Limited { retry_after };
        }

        entry.count += 1;
        Status::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }

    /// Read-only peek at a key's current status: never increments, never creates a
    /// window entry for a key that doesn't have one yet (§4.A `Status(key)`). A key
    /// with no window, or whose window has already elapsed, reads as fully allowed.
    pub fn status(&self, key: &str, now: DateTime<Utc>) -> Status {
        let window_duration = chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::zero());
        let Some(entry) = self.windows.get(key) else {
            return Status::Allowed { remaining: self.max_requests };
        };

        if now - entry.started_at >= window_duration {
            return Status::Allowed { remaining: self.max_requests };
        }

        if entry.count >= self.max_requests {
            let reset_at = entry.started_at + window_duration;
            let retry_after = (reset_at - now).to_std().unwrap_or(Duration::ZERO);
            return Status::Limited { retry_after };
        }

        Status::Allowed { remaining: self.max_requests - entry.count }
    }

    /// Drop a key's window entirely, as if it had never made a request.
    pub fn reset(&self, key: &str) {
        self.windows.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_then_limits() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Utc::now();
        assert_eq!(limiter.check_and_increment("ip1", now), Status::Allowed { remaining: 1 });
        assert_eq!(limiter.check_and_increment("ip1", now), Status::Allowed { remaining: 0 });
        match limiter.check_and_increment("ip1", now) {
            Status::Limited { retry_after } => assert!(retry_after.as_secs() <= 60),
            other => panic!("expected Limited, got {other:?}"),
        }
    }

    #[test]
    fn separate_keys_have_independent_windows() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Utc::now();
        assert_eq!(limiter.check_and_increment("a", now), Status::Allowed { remaining: 0 });
        assert_eq!(limiter.check_and_increment("b", now), Status::Allowed { remaining: 0 });
    }

    #[test]
    fn window_resets_after_elapsed_duration() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Utc::now();
        assert_eq!(limiter.check_and_increment("a", now), Status::Allowed { remaining: 0 });
        let later = now + chrono::Duration::seconds(61);
        assert_eq!(limiter.check_and_increment("a", later), Status::Allowed { remaining: 0 });
    }

    #[test]
    fn reset_clears_key() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Utc::now();
        limiter.check_and_increment("a", now);
        limiter.reset("a");
        assert_eq!(limiter.check_and_increment("a", now), Status::Allowed { remaining: 0 });
    }

    #[test]
    fn status_does_not_increment() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Utc::now();
        assert_eq!(limiter.status("a", now), Status::Allowed { remaining: 1 });
        assert_eq!(limiter.status("a", now), Status::Allowed { remaining: 1 });
        assert_eq!(limiter.check_and_increment("a", now), Status::Allowed { remaining: 0 });
        match limiter.status("a", now) {
            Status::Limited { retry_after } => assert!(retry_after.as_secs() <= 60),
            other => panic!("expected Limited, got {other:?}"),
        }
    }
}
