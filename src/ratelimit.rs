//! Sliding-window tracker for failed attempts, keyed by an opaque
//! identifier (client address or username), with background expiry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug)]
struct AttemptRecord {
    count: u32,
    first_attempt: Instant,
    blocked_until: Option<Instant>,
}

/// Point-in-time counters, for operational visibility.
#[derive(Clone, Copy, Debug)]
pub struct RateLimiterStats {
    pub tracked: usize,
    pub blocked: usize,
    pub max_attempts: u32,
    pub block_duration: Duration,
}

/// Per-identifier failure counting: Clean -> Accumulating -> Blocked ->
/// (expired) -> Clean. One lock guards the whole map; reads take shared
/// access, mutations exclusive. Record mutation is O(1) and short-lived.
pub struct RateLimiter {
    attempts: RwLock<HashMap<String, AttemptRecord>>,
    max_attempts: u32,
    block_duration: Duration,
    sweep_period: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, block_duration: Duration) -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
            max_attempts,
            block_duration,
            sweep_period: Duration::from_secs(5 * 60),
        }
    }

    pub fn with_sweep_period(mut self, period: Duration) -> Self {
        self.sweep_period = period;
        self
    }

    /// Whether the identifier is inside an active block window.
    pub fn is_blocked(&self, identifier: &str) -> bool {
        let attempts = self.attempts.read().expect("rate limiter lock poisoned");
        match attempts.get(identifier).and_then(|r| r.blocked_until) {
            Some(until) => Instant::now() < until,
            None => false,
        }
    }

    /// Count one failed attempt. Entering the blocked state happens here,
    /// exactly once per episode; further failures while blocked do not
    /// extend the window.
    pub fn record_failed_attempt(&self, identifier: &str) {
        let now = Instant::now();
        let mut attempts = self.attempts.write().expect("rate limiter lock poisoned");
        let record = attempts.entry(identifier.to_string()).or_insert(AttemptRecord {
            count: 0,
            first_attempt: now,
            blocked_until: None,
        });

        // a lapsed block restarts the episode from one
        if let Some(until) = record.blocked_until {
            if now >= until {
                record.count = 1;
                record.first_attempt = now;
                record.blocked_until = None;
                return;
            }
        }

        record.count += 1;
        if record.blocked_until.is_none() && record.count >= self.max_attempts {
            let until = now + self.block_duration;
            record.blocked_until = Some(until);
            warn!(
                identifier,
                block_secs = self.block_duration.as_secs(),
                "rate limit exceeded"
            );
        }
    }

    /// Forget the identifier entirely (successful authentication).
    pub fn reset_attempts(&self, identifier: &str) {
        let mut attempts = self.attempts.write().expect("rate limiter lock poisoned");
        attempts.remove(identifier);
    }

    /// Attempts left before the identifier blocks.
    pub fn remaining_attempts(&self, identifier: &str) -> u32 {
        let attempts = self.attempts.read().expect("rate limiter lock poisoned");
        match attempts.get(identifier) {
            Some(record) => self.max_attempts.saturating_sub(record.count),
            None => self.max_attempts,
        }
    }

    /// End of the identifier's block window, while one is active.
    pub fn blocked_until(&self, identifier: &str) -> Option<Instant> {
        let attempts = self.attempts.read().expect("rate limiter lock poisoned");
        attempts.get(identifier).and_then(|r| r.blocked_until)
    }

    pub fn stats(&self) -> RateLimiterStats {
        let attempts = self.attempts.read().expect("rate limiter lock poisoned");
        let now = Instant::now();
        RateLimiterStats {
            tracked: attempts.len(),
            blocked: attempts
                .values()
                .filter(|r| r.blocked_until.is_some_and(|u| now < u))
                .count(),
            max_attempts: self.max_attempts,
            block_duration: self.block_duration,
        }
    }

    /// Drop records that can no longer influence a decision: blocked ones
    /// a full block-duration after their window ended, never-blocked ones
    /// two block-durations after their first attempt. Bounds memory growth
    /// from one-off failures that are never retried.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut attempts = self.attempts.write().expect("rate limiter lock poisoned");
        let before = attempts.len();
        attempts.retain(|_, record| {
            let horizon = match record.blocked_until {
                Some(until) => until + self.block_duration,
                None => record.first_attempt + self.block_duration * 2,
            };
            now < horizon
        });
        let removed = before - attempts.len();
        if removed > 0 {
            debug!(removed, "rate limiter sweep");
        }
    }

    /// Run `sweep` on a fixed period until the returned guard is dropped or
    /// shut down. The task holds only a weak handle, so dropping the
    /// limiter also ends it.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweeperGuard {
        let limiter = Arc::downgrade(self);
        let period = self.sweep_period;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // the first tick fires immediately
            loop {
                ticker.tick().await;
                match limiter.upgrade() {
                    Some(limiter) => limiter.sweep(),
                    None => break,
                }
            }
        });
        SweeperGuard { handle }
    }
}

/// Owns the background sweep task; aborts it on drop so process shutdown
/// cannot leak the timer.
pub struct SweeperGuard {
    handle: JoinHandle<()>,
}

impl SweeperGuard {
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for SweeperGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn blocks_on_the_configured_attempt() {
        let rl = RateLimiter::new(3, Duration::from_secs(60));
        rl.record_failed_attempt("x");
        rl.record_failed_attempt("x");
        assert!(!rl.is_blocked("x"));
        rl.record_failed_attempt("x");
        assert!(rl.is_blocked("x"));
    }

    #[test]
    fn unknown_identifier_is_clean() {
        let rl = RateLimiter::new(3, Duration::from_secs(60));
        assert!(!rl.is_blocked("nobody"));
        assert_eq!(rl.remaining_attempts("nobody"), 3);
    }

    #[test]
    fn reset_clears_an_active_block() {
        let rl = RateLimiter::new(2, Duration::from_secs(60));
        rl.record_failed_attempt("x");
        rl.record_failed_attempt("x");
        assert!(rl.is_blocked("x"));
        rl.reset_attempts("x");
        assert!(!rl.is_blocked("x"));
        assert_eq!(rl.remaining_attempts("x"), 2);
    }

    #[test]
    fn lapsed_block_restarts_the_count_at_one() {
        let rl = RateLimiter::new(2, Duration::from_millis(30));
        rl.record_failed_attempt("x");
        rl.record_failed_attempt("x");
        assert!(rl.is_blocked("x"));
        sleep(Duration::from_millis(40));
        assert!(!rl.is_blocked("x"));
        rl.record_failed_attempt("x");
        assert!(!rl.is_blocked("x"));
        assert_eq!(rl.remaining_attempts("x"), 1);
    }

    #[test]
    fn block_window_is_set_once_per_episode() {
        let rl = RateLimiter::new(2, Duration::from_secs(60));
        rl.record_failed_attempt("x");
        rl.record_failed_attempt("x");
        let first = rl.blocked_until("x").unwrap();
        rl.record_failed_attempt("x");
        assert_eq!(rl.blocked_until("x").unwrap(), first);
    }

    #[test]
    fn sweep_removes_expired_and_stale_records() {
        let rl = RateLimiter::new(1, Duration::from_millis(10));
        rl.record_failed_attempt("blocked");
        let rl_clean = RateLimiter::new(5, Duration::from_millis(10));
        rl_clean.record_failed_attempt("one-off");

        sleep(Duration::from_millis(30));
        rl.sweep();
        rl_clean.sweep();
        assert_eq!(rl.stats().tracked, 0);
        assert_eq!(rl_clean.stats().tracked, 0);
    }

    #[test]
    fn sweep_keeps_live_records() {
        let rl = RateLimiter::new(2, Duration::from_secs(60));
        rl.record_failed_attempt("x");
        rl.sweep();
        assert_eq!(rl.stats().tracked, 1);
    }

    #[test]
    fn stats_reports_blocked_count() {
        let rl = RateLimiter::new(1, Duration::from_secs(60));
        rl.record_failed_attempt("a");
        rl.record_failed_attempt("b");
        let stats = rl.stats();
        assert_eq!(stats.tracked, 2);
        assert_eq!(stats.blocked, 2);
        assert_eq!(stats.max_attempts, 1);
    }

    #[tokio::test]
    async fn sweeper_task_expires_records_and_stops() {
        let rl = Arc::new(
            RateLimiter::new(1, Duration::from_millis(5)).with_sweep_period(Duration::from_millis(10)),
        );
        rl.record_failed_attempt("x");
        let guard = rl.spawn_sweeper();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(rl.stats().tracked, 0);
        guard.shutdown();
    }
}
