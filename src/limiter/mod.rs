//! Per-key sliding-window admission control
//!
//! Each caller key (typically the client IP) owns a bucket of admission
//! timestamps. A request is admitted while the bucket holds fewer than
//! `max_requests` timestamps inside the trailing window; the window slides
//! continuously, so expired timestamps are pruned from the head of the
//! bucket on every decision.
//!
//! The keyspace is a concurrent map with one mutex per bucket: unrelated
//! callers never contend on a shared lock, while the read-prune-check-append
//! sequence for a single key is atomic. The keyspace is capped at
//! [`MAX_KEYS`] entries; at capacity, requests from brand-new keys are
//! denied rather than growing the map, which bounds memory under
//! adversarial key churn.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::SharedConfig;

/// Hard ceiling on distinct tracked keys. Past this point new keys are
/// denied instead of evicting old ones, so memory stays deterministic under
/// attack.
pub const MAX_KEYS: usize = 100_000;

type Bucket = Arc<Mutex<VecDeque<u64>>>;

/// Sliding-window-log rate limiter keyed by caller identity
pub struct RateLimiter {
    config: Arc<SharedConfig>,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new(config: Arc<SharedConfig>) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    /// Decide whether a request from `key` is admitted right now.
    ///
    /// Admission records the current timestamp in the key's bucket; denial
    /// leaves the bucket untouched. Denial is a plain `false`, never an
    /// error.
    pub fn allowed(&self, key: &str) -> bool {
        self.allowed_at(key, now_millis())
    }

    fn allowed_at(&self, key: &str, now: u64) -> bool {
        let cfg = self.config.current();
        let limit = &cfg.rate_limit;
        if !limit.enabled {
            return true;
        }
        // Fail closed on malformed bounds; validate() rejects these at
        // config load, this guards the runtime-swap path.
        if limit.max_requests == 0 || limit.window_minutes == 0 {
            return false;
        }
        let window_start = now.saturating_sub(limit.window_millis());

        let bucket = match self.buckets.get(key) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                if self.buckets.len() >= MAX_KEYS {
                    return false;
                }
                Arc::clone(self.buckets.entry(key.to_string()).or_default().value())
            }
        };

        let mut timestamps = bucket.lock();
        prune_expired(&mut timestamps, window_start);
        if timestamps.len() >= limit.max_requests as usize {
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// Sweep every bucket, dropping expired timestamps and removing keys
    /// whose buckets end up empty.
    ///
    /// Housekeeping only: `allowed` prunes lazily on access, so skipping a
    /// sweep never changes admission decisions. Emptiness is re-checked
    /// under the bucket's own mutex immediately before removal so a
    /// concurrently admitted timestamp is not swept away.
    pub fn cleanup(&self) {
        self.cleanup_at(now_millis());
    }

    fn cleanup_at(&self, now: u64) {
        let cfg = self.config.current();
        let limit = &cfg.rate_limit;
        if limit.window_minutes == 0 {
            return;
        }
        let window_start = now.saturating_sub(limit.window_millis());

        self.buckets.retain(|_, bucket| {
            let mut timestamps = bucket.lock();
            prune_expired(&mut timestamps, window_start);
            !timestamps.is_empty()
        });
        debug!(keys = self.buckets.len(), "rate limiter cleanup completed");
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    /// Spawn the periodic cleanup task.
    ///
    /// The period is derived from the window configured at spawn time;
    /// later window changes apply to admission immediately but not to the
    /// sweep schedule until restart.
    pub fn spawn_cleanup(self: Arc<Self>) -> JoinHandle<()> {
        let limiter = self;
        let period =
            Duration::from_millis(limiter.config.current().rate_limit.window_millis().max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // interval fires immediately; skip the zeroth tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.cleanup();
            }
        })
    }
}

/// Drop timestamps at or before `window_start` from the head of the bucket.
/// The lower bound is exclusive: a timestamp exactly at the boundary no
/// longer counts toward the limit.
fn prune_expired(timestamps: &mut VecDeque<u64>, window_start: u64) {
    while timestamps.front().is_some_and(|&ts| ts <= window_start) {
        timestamps.pop_front();
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
