use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::RateLimitConfig;

/// Per-client attempt counter.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitEntry {
    pub attempt_count: u32,
    pub window_start: Instant,
}

/// Fixed-reset window limiter for code-check attempts.
///
/// A client's window starts at its first attempt and is reset by the first
/// attempt made after it elapsed. Bursts straddling a reset can therefore
/// pass up to twice the threshold in a short span.
///
/// State lives in process memory only and is lost on restart. Entries are
/// kept until [`RateLimiter::cleanup_expired`] drops the elapsed ones.
#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, RateLimitEntry>>,
    max_attempts: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_attempts,
            window,
        }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        Self::new(cfg.max_attempts, cfg.window())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an attempt from `client` and report whether it is limited.
    pub fn record_attempt(&self, client: &str) -> bool {
        self.record_attempt_at(client, Instant::now())
    }

    pub fn record_attempt_at(&self, client: &str, now: Instant) -> bool {
        // The shard lock is held only for this read-modify-write.
        let mut entry = self
            .entries
            .entry(client.to_string())
            .or_insert(RateLimitEntry { attempt_count: 0, window_start: now });

        if entry.attempt_count == 0 || now.saturating_duration_since(entry.window_start) > self.window {
            *entry = RateLimitEntry { attempt_count: 1, window_start: now };
            return false;
        }

        entry.attempt_count = entry.attempt_count.saturating_add(1);
        let limited = entry.attempt_count > self.max_attempts;
        if limited {
            debug!(client, attempts = entry.attempt_count, "rate limit exceeded");
        }
        limited
    }

    /// Current entry for `client`, if any.
    pub fn entry(&self, client: &str) -> Option<RateLimitEntry> {
        self.entries.get(client).map(|e| *e.value())
    }

    /// Number of client identities currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.entries.len()
    }

    /// Drop entries whose window has elapsed. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Instant::now())
    }

    pub fn cleanup_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.window_start) <= self.window);
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            info!(removed, remaining = self.entries.len(), "Cleaned up expired rate-limit entries");
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(15 * 60);

    #[test]
    fn test_threshold_attempt_passes_next_is_limited() {
        let limiter = RateLimiter::new(10, WINDOW);
        let start = Instant::now();

        for attempt in 1..=10 {
            let now = start + Duration::from_secs(attempt);
            assert!(!limiter.record_attempt_at("10.0.0.1", now), "attempt {attempt}");
        }
        assert!(limiter.record_attempt_at("10.0.0.1", start + Duration::from_secs(11)));
        assert!(limiter.record_attempt_at("10.0.0.1", start + Duration::from_secs(12)));
    }

    #[test]
    fn test_window_expiry_resets_count() {
        let limiter = RateLimiter::new(3, WINDOW);
        let start = Instant::now();

        for _ in 0..5 {
            limiter.record_attempt_at("client", start);
        }
        assert!(limiter.record_attempt_at("client", start + WINDOW));

        let after = start + WINDOW + Duration::from_millis(1);
        assert!(!limiter.record_attempt_at("client", after));
        let entry = limiter.entry("client").unwrap();
        assert_eq!(entry.attempt_count, 1);
        assert_eq!(entry.window_start, after);
    }

    #[test]
    fn test_clients_are_counted_independently() {
        let limiter = RateLimiter::new(1, WINDOW);
        let now = Instant::now();

        assert!(!limiter.record_attempt_at("a", now));
        assert!(limiter.record_attempt_at("a", now));
        assert!(!limiter.record_attempt_at("b", now));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn test_cleanup_drops_only_elapsed_windows() {
        let limiter = RateLimiter::new(10, WINDOW);
        let start = Instant::now();

        limiter.record_attempt_at("old", start);
        limiter.record_attempt_at("fresh", start + WINDOW);

        let removed = limiter.cleanup_expired_at(start + WINDOW + Duration::from_secs(1));
        assert_eq!(removed, 1);
        assert!(limiter.entry("old").is_none());
        assert!(limiter.entry("fresh").is_some());
    }
}
