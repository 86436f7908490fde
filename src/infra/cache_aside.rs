//! Cache-aside reads for single entities.
//!
//! The cache is only an accelerator: every cache failure degrades to a miss
//! and the store answers instead. Entries carry their own expiry so a stale
//! entry is ignored even if the backend kept it past its TTL.

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::cache::CacheStore;
use super::repositories::AccountRepository;
use crate::config::{CACHE_PREFIX_ACCOUNT, DEFAULT_CACHE_TTL_SECONDS};
use crate::domain::Account;
use crate::errors::{AppError, AppResult};

/// Where a value was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Cache,
    Store,
}

impl ReadSource {
    pub fn is_hit(&self) -> bool {
        matches!(self, ReadSource::Cache)
    }
}

/// A value together with the layer that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup<T> {
    pub value: T,
    pub source: ReadSource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Stored form of a cached value. `expires_at` is in unix seconds.
#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    value: T,
    expires_at: i64,
}

/// Read-through accessor over an optional cache.
pub struct CacheAside {
    cache: Option<Arc<dyn CacheStore>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for CacheAside {
    fn default() -> Self {
        Self::disabled()
    }
}

impl CacheAside {
    pub fn new(cache: Option<Arc<dyn CacheStore>>, ttl: Duration) -> Self {
        Self {
            cache,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Accessor that always reads from the store.
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    pub fn account_key(id: i64) -> String {
        format!("{}{}", CACHE_PREFIX_ACCOUNT, id)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Look up an account by id, cache first.
    ///
    /// # Errors
    /// `NotFound` when the store has no such account. Store errors propagate;
    /// cache errors never do.
    pub async fn get_account(
        &self,
        repo: &dyn AccountRepository,
        id: i64,
    ) -> AppResult<CacheLookup<Account>> {
        let key = Self::account_key(id);
        self.read_through(&key, || repo.find_by_id(id)).await
    }

    /// Drop the cached snapshot of an account after it changed.
    pub async fn invalidate_account(&self, id: i64) {
        let Some(cache) = &self.cache else {
            return;
        };

        let key = Self::account_key(id);
        if let Err(e) = cache.delete(&key).await {
            tracing::warn!(key = %key, "Cache invalidation failed, entry expires by TTL: {}", e);
        }
    }

    async fn read_through<T, F, Fut>(&self, key: &str, load: F) -> AppResult<CacheLookup<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Option<T>>>,
    {
        if let Some(value) = self.cached(key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "Cache hit");
            return Ok(CacheLookup {
                value,
                source: ReadSource::Cache,
            });
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, "Cache miss");

        // Absent rows are never cached
        let value = load().await?.ok_or(AppError::NotFound)?;
        self.populate(key, &value).await;

        Ok(CacheLookup {
            value,
            source: ReadSource::Store,
        })
    }

    /// Fetch and decode a live entry. Every failure is a miss.
    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;

        let raw = match cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, "Cache read failed, treating as miss: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<Envelope<T>>(&raw) {
            Ok(entry) if entry.expires_at > Utc::now().timestamp() => Some(entry.value),
            Ok(_) => {
                tracing::debug!(key = %key, "Cache entry expired");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, "Undecodable cache entry, treating as miss: {}", e);
                None
            }
        }
    }

    /// Best-effort write; failures are logged and swallowed.
    async fn populate<T: Serialize>(&self, key: &str, value: &T) {
        let Some(cache) = &self.cache else {
            return;
        };

        let expires_at = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| Utc::now().timestamp().checked_add(ttl));
        let Some(expires_at) = expires_at else {
            tracing::warn!(key = %key, "Cache TTL out of range, not caching");
            return;
        };

        let json = match serde_json::to_string(&Envelope { value, expires_at }) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key = %key, "Cache serialization failed: {}", e);
                return;
            }
        };

        if let Err(e) = cache.set(key, json, self.ttl.as_secs()).await {
            tracing::warn!(key = %key, "Cache population failed: {}", e);
        }
    }
}
