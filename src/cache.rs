//! Time-bounded key/value cache shared by every request.
//!
//! Each entry carries its own TTL, fixed when it is set. Reads never return an
//! entry past its expiry; expired entries are physically dropped by [`TtlCache::sweep`],
//! which the bootstrap runs on an interval via [`TtlCache::spawn_sweeper`].

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use moka::{future::Cache, Expiry};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
}

struct PerEntryTtl;

impl<V> Expiry<String, Entry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

#[derive(Clone)]
pub struct TtlCache<V> {
    inner: Cache<String, Entry<V>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).await.map(|entry| entry.value)
    }

    /// Stores `value` under `key`, replacing any previous entry and restarting its expiry.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.inner.insert(key.into(), Entry { value, ttl }).await;
    }

    pub async fn delete(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Returns the live entry for `key`, or runs `init` and stores its output.
    ///
    /// Concurrent callers missing on the same key share one `init` run. A failed
    /// `init` stores nothing.
    pub async fn get_or_try_insert_with<F, E>(
        &self,
        key: impl Into<String>,
        ttl: Duration,
        init: F,
    ) -> Result<V, Arc<E>>
    where
        F: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        self.inner
            .try_get_with(key.into(), async move {
                init.await.map(|value| Entry { value, ttl })
            })
            .await
            .map(|entry| entry.value)
    }

    /// Drops every expired entry.
    pub async fn sweep(&self) {
        self.inner.run_pending_tasks().await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                cache.sweep().await;
                tracing::debug!(entries = cache.entry_count(), "cache sweep done");
            }
        })
    }
}

impl<V> Default for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
