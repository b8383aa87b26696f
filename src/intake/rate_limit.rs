//! Fixed-window submission quota per source.
//!
//! Windows are fixed from the first submission, not sliding: a burst at the end
//! of one window followed by a burst at the start of the next is admitted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Bucket for callers whose origin could not be determined.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Per-source counter for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

impl RateLimitRecord {
    /// A fresh window opened by one submission at `now`.
    pub fn opened_at(now: DateTime<Utc>) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    /// Whether more than `window` has passed since the window opened.
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match chrono::Duration::from_std(window) {
            Ok(window) => now.signed_duration_since(self.window_start) > window,
            Err(_) => false,
        }
    }
}

/// Outcome of counting one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Admitted; `count` submissions seen in the window including this one.
    Allowed { count: u32 },
    /// Quota already used up for this window.
    Limited { count: u32 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Backend-agnostic storage for rate-limit records.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Current record for `key`, if any.
    async fn get(&self, key: &str) -> Option<RateLimitRecord>;

    /// Overwrite the record for `key`.
    async fn put(&self, key: &str, record: RateLimitRecord);

    /// Count one submission for `key` as a single atomic read-modify-write.
    ///
    /// Expired or missing windows are reset to a count of 1. A window already
    /// at `quota` is left untouched and reported as limited.
    async fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        quota: u32,
        window: Duration,
    ) -> RateDecision;

    /// Drop every record whose window has expired. Returns how many were removed.
    async fn sweep(&self, now: DateTime<Utc>, window: Duration) -> usize;

    /// Number of tracked sources.
    async fn len(&self) -> usize;
}

/// In-process store. Records live until the sweep evicts them or the process exits.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    records: RwLock<HashMap<String, RateLimitRecord>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn get(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.read().await.get(key).copied()
    }

    async fn put(&self, key: &str, record: RateLimitRecord) {
        self.records.write().await.insert(key.to_string(), record);
    }

    async fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        quota: u32,
        window: Duration,
    ) -> RateDecision {
        // Held across the whole check-then-increment.
        let mut records = self.records.write().await;

        match records.get_mut(key) {
            Some(record) if !record.is_expired(now, window) => {
                if record.count >= quota {
                    return RateDecision::Limited {
                        count: record.count,
                    };
                }
                record.count += 1;
                RateDecision::Allowed {
                    count: record.count,
                }
            }
            _ => {
                records.insert(key.to_string(), RateLimitRecord::opened_at(now));
                RateDecision::Allowed { count: 1 }
            }
        }
    }

    async fn sweep(&self, now: DateTime<Utc>, window: Duration) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now, window));
        before - records.len()
    }

    async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

/// Binds a store to a quota and window length.
#[derive(Clone)]
pub struct FixedWindowLimiter {
    store: Arc<dyn RateLimitStore>,
    quota: u32,
    window: Duration,
}

impl FixedWindowLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, quota: u32, window: Duration) -> Self {
        Self {
            store,
            quota,
            window,
        }
    }

    /// Limiter over a fresh in-memory store.
    pub fn in_memory(quota: u32, window: Duration) -> Self {
        Self::new(Arc::new(InMemoryRateLimitStore::new()), quota, window)
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    /// Count a submission from `source` now. `None` maps to the shared unknown bucket.
    pub async fn check(&self, source: Option<&str>) -> RateDecision {
        self.check_at(source, Utc::now()).await
    }

    pub async fn check_at(&self, source: Option<&str>, now: DateTime<Utc>) -> RateDecision {
        let key = source_key(source);
        let decision = self.store.hit(key, now, self.quota, self.window).await;
        debug!(source = key, ?decision, "Rate limit checked");
        decision
    }

    /// Evict expired windows.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let removed = self.store.sweep(now, self.window).await;
        if removed > 0 {
            info!(count = removed, "Evicted expired rate-limit records");
        }
        removed
    }
}

/// Normalise a source identifier into a store key.
pub fn source_key(source: Option<&str>) -> &str {
    source
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_SOURCE)
}

/// Spawn a background task that periodically evicts expired records.
pub fn spawn_sweep_task(
    limiter: FixedWindowLimiter,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            limiter.sweep().await;
        }
    })
}
