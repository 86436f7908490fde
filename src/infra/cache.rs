//! Redis cache implementation.
//!
//! [`CacheStore`] is the minimal string key/value surface the cache-aside
//! accessor needs. [`Cache`] implements it on a Redis connection manager.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use crate::config::Config;
use crate::errors::{AppError, AppResult};

/// Key/value store with per-entry expiry.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Store `value` under `key` for `ttl_seconds`.
    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Round-trip check used by the health endpoint.
    async fn ping(&self) -> AppResult<()>;
}

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    /// Connect to Redis, returning an error instead of panicking.
    pub async fn try_connect(config: &Config) -> Result<Self, RedisError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");

        Ok(Self { connection })
    }

    /// Connect when caching is enabled; an unreachable Redis disables the cache.
    pub async fn connect_optional(config: &Config) -> Option<Self> {
        if !config.cache_enabled {
            tracing::info!("Cache disabled by configuration");
            return None;
        }

        match Self::try_connect(config).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!("Redis unavailable, continuing without cache: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl CacheStore for Cache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await.map_err(cache_error)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> AppResult<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await.map_err(cache_error)?;
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }
}

/// Convert Redis error to AppError
fn cache_error(e: RedisError) -> AppError {
    tracing::debug!("Redis error: {}", e);
    AppError::connection(format!("Cache error: {}", e))
}
