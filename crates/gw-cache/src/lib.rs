//! Cache service: typed `Get`/`Set`/`Delete`/`Unlink`/`DeletePattern`/`GetWithFallback` over a
//! TTL-keyed store. Backs the provider registry and absorbs invalidations from admin mutations
//! elsewhere in the system. Values are JSON-encoded. Every read path is expected to fall back to an
//! in-memory snapshot on cache miss or failure — this service never turns a cache problem into a
//! user-visible error; `cacheUnavailable` is observable only through logs.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache as MokaCache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

struct Entry {
    value: JsonValue,
    ttl: Duration,
}

struct PerEntryExpiry;

impl Expiry<String, Arc<Entry>> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<Entry>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Async key-value cache with per-entry TTL.
#[derive(Clone)]
pub struct Cache {
    inner: MokaCache<String, Arc<Entry>>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl Cache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryExpiry)
            .build();
        Self { inner }
    }

    /// Reads a typed value. Returns `Ok(None)` on miss; deserialization failure is logged and treated
    /// as a miss rather than propagated — a malformed cache entry must never fail the caller's request.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.inner.get(key).await?;
        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "cache entry failed to deserialize, treating as miss");
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: impl Into<String>, value: &T, ttl: Duration) {
        let Ok(json) = serde_json::to_value(value) else {
            tracing::warn!("cache value failed to serialize, skipping set");
            return;
        };
        self.inner
            .insert(key.into(), Arc::new(Entry { value: json, ttl }))
            .await;
    }

    pub async fn delete(&self, key: &str) {
        self.inner.remove(key).await;
    }

    /// Non-blocking variant of [`Cache::delete`], preferred for large payloads — spawned so the caller
    /// never waits on eviction.
    pub fn unlink(&self, key: impl Into<String>) {
        let inner = self.inner.clone();
        let key = key.into();
        tokio::spawn(async move {
            inner.remove(&key).await;
        });
    }

    /// Deletes every key matching `prefix:*`. Moka has no native glob scan, so this walks the current
    /// entry set — acceptable at this cache's bounded size.
    pub async fn delete_pattern(&self, prefix: &str) {
        let pattern = format!("{prefix}:");
        let matching: Vec<String> = self
            .inner
            .iter()
            .map(|(k, _)| (*k).clone())
            .filter(|k| k.starts_with(&pattern))
            .collect();
        for key in matching {
            self.inner.remove(&key).await;
        }
    }

    /// Read-through with a fallback loader run on miss. The loader's result is cached but failures from
    /// it propagate directly — the fallback itself (e.g. the registry's in-memory snapshot) is the
    /// authority, the cache is purely an accelerator.
    pub async fn get_with_fallback<T, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> T
    where
        T: Serialize + DeserializeOwned + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return cached;
        }
        let value = loader().await;
        self.set(key, &value, ttl).await;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = Cache::new(100);
        cache.set("k", &42u32, Duration::from_secs(60)).await;
        assert_eq!(cache.get::<u32>("k").await, Some(42));
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let cache = Cache::new(100);
        assert_eq!(cache.get::<u32>("missing").await, None);
    }

    #[tokio::test]
    async fn delete_pattern_scopes_to_prefix() {
        let cache = Cache::new(100);
        cache.set("svc:a", &1u32, Duration::from_secs(60)).await;
        cache.set("svc:b", &2u32, Duration::from_secs(60)).await;
        cache.set("other:c", &3u32, Duration::from_secs(60)).await;
        cache.delete_pattern("svc").await;
        assert_eq!(cache.get::<u32>("svc:a").await, None);
        assert_eq!(cache.get::<u32>("svc:b").await, None);
        assert_eq!(cache.get::<u32>("other:c").await, Some(3));
    }

    #[tokio::test]
    async fn get_with_fallback_caches_loader_result() {
        let cache = Cache::new(100);
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let calls2 = calls.clone();
        let value = cache
            .get_with_fallback("k", Duration::from_secs(60), || async move {
                calls2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                7u32
            })
            .await;
        assert_eq!(value, 7);
        let value2 = cache
            .get_with_fallback("k", Duration::from_secs(60), || async { 99u32 })
            .await;
        assert_eq!(value2, 7, "second call should hit cache, not the loader");
        assert_eq!(calls.load(std::sync::Ordering::SeqCst), 1);
    }
}
