//! Short-TTL read-through cache of per-pair inventory status
//!
//! Redis is used when configured; otherwise an in-process map with the same
//! expiry semantics. Failures here never fail a workflow: the TTL bounds how
//! stale a missed invalidation can leave an entry.

use serde::{de::DeserializeOwned, Serialize};
use shared::StockKey;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

mod memory;
mod redis;

pub use self::memory::InMemoryCache;
pub use self::redis::RedisCache;

use crate::config::CacheConfig;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// `inventory:{product_id}:{location_id}`
pub fn cache_key(key: &StockKey) -> String {
    format!("inventory:{}:{}", key.product_id, key.location_id)
}

/// Typed view over a [`CacheBackend`] keyed by product/location pair
#[derive(Clone)]
pub struct BalanceCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    enabled: bool,
}

impl BalanceCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            enabled: true,
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self {
            backend: Arc::new(InMemoryCache::new()),
            ttl: Duration::ZERO,
            enabled: false,
        }
    }

    /// Pick the backend named by configuration.
    ///
    /// An unreachable Redis falls back to the in-process cache with a warning.
    pub async fn from_config(config: &CacheConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        let ttl = Duration::from_secs(config.ttl_secs);

        if let Some(url) = &config.redis_url {
            match RedisCache::connect(url).await {
                Ok(redis) => {
                    tracing::info!("Using Redis balance cache");
                    return Self::new(Arc::new(redis), ttl);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to connect to Redis, falling back to in-memory cache");
                }
            }
        }

        Self::new(Arc::new(InMemoryCache::new()), ttl)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &StockKey) -> Result<Option<T>, CacheError> {
        if !self.enabled {
            return Ok(None);
        }
        match self.backend.get(&cache_key(key)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn put<T: Serialize + Sync>(&self, key: &StockKey, value: &T) -> Result<(), CacheError> {
        if !self.enabled {
            return Ok(());
        }
        let raw = serde_json::to_string(value)?;
        self.backend.set(&cache_key(key), &raw, self.ttl).await
    }

    pub async fn invalidate(&self, key: &StockKey) -> Result<(), CacheError> {
        if !self.enabled {
            return Ok(());
        }
        self.backend.delete(&cache_key(key)).await
    }

    /// Drop every key, logging rather than returning failures
    pub async fn invalidate_all<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a StockKey>,
    {
        for key in keys {
            if let Err(e) = self.invalidate(key).await {
                tracing::warn!(
                    product_id = %key.product_id,
                    location_id = %key.location_id,
                    error = %e,
                    "Cache invalidation failed"
                );
            }
        }
    }
}
