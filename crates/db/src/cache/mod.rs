//! Cache-aside layer for ledger read paths.
//!
//! Reads outside an atomic scope go through [`CacheAside::get_or_fetch`].
//! Writes never read through the cache; they invalidate the affected keys
//! after commit. Cache failures are logged and swallowed, so a broken
//! backend degrades to plain database reads and never fails a request.

mod key;
mod memory;

pub use key::{CacheKey, CacheTtls};
pub use memory::MokaCacheBackend;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use finly_shared::ErrorKind;
use finly_shared::config::CacheConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be reached or rejected the command.
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A payload could not be encoded.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Cache
    }
}

/// Key-value store holding serialized payloads with a TTL.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the payload stored under `key`, if any and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `payload` under `key` for `ttl`.
    async fn set(&self, key: &str, payload: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes every key in `keys`. Missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> Result<(), CacheError>;
}

/// Cache-aside access over a [`CacheBackend`].
///
/// Clones share the backend and the invalidation epoch.
#[derive(Clone)]
pub struct CacheAside {
    backend: Arc<dyn CacheBackend>,
    ttls: CacheTtls,
    epoch: Arc<AtomicU64>,
}

impl CacheAside {
    /// Wraps an arbitrary backend.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, ttls: CacheTtls) -> Self {
        Self {
            backend,
            ttls,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// In-process Moka backend sized and timed from configuration.
    #[must_use]
    pub fn in_memory(config: &CacheConfig) -> Self {
        Self::new(
            Arc::new(MokaCacheBackend::new(config.max_capacity)),
            CacheTtls::from(config),
        )
    }

    /// Configured TTL for `key`.
    #[must_use]
    pub const fn ttl_for(&self, key: &CacheKey) -> Duration {
        self.ttls.for_key(key)
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its result.
    ///
    /// A backend read error, a missing entry, and an undecodable entry all
    /// fall through to `fetch`. Failures of `fetch` are returned unchanged
    /// and nothing is cached. Failing to store the fetched value is logged.
    ///
    /// If [`invalidate`](Self::invalidate) runs on this `CacheAside` (or a
    /// clone) while `fetch` is in flight, the fetched value may predate the
    /// write that triggered it. It is returned to the caller but not left in
    /// the cache. Invalidations issued by other processes sharing a networked
    /// backend are not observed, so there a stale value lives at most one TTL.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let cache_key = key.to_string();

        match self.backend.get(&cache_key).await {
            Ok(Some(payload)) => match serde_json::from_str::<T>(&payload) {
                Ok(value) => {
                    debug!(cache_key = %cache_key, "Cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(cache_key = %cache_key, error = %e, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => debug!(cache_key = %cache_key, "Cache miss"),
            Err(e) => warn!(
                cache_key = %cache_key,
                kind = ?e.kind(),
                error = %e,
                "Cache read failed, using database"
            ),
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let value = fetch().await?;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(cache_key = %cache_key, "Invalidated during fetch, not caching");
            return Ok(value);
        }
        if let Err(e) = self.store(&cache_key, &value, ttl).await {
            warn!(cache_key = %cache_key, kind = ?e.kind(), error = %e, "Failed to cache value");
            return Ok(value);
        }
        // An invalidation between the check and the store would otherwise be lost.
        if self.epoch.load(Ordering::SeqCst) != epoch {
            self.evict(&[cache_key]).await;
        }

        Ok(value)
    }

    async fn store<T: Serialize>(&self, cache_key: &str, value: &T, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value)?;
        self.backend.set(cache_key, payload, ttl).await
    }

    /// Deletes every key in `keys`. Failures are logged, never returned.
    ///
    /// Also bumps the invalidation epoch so fetches already in flight do not
    /// repopulate the keys with pre-write values.
    pub async fn invalidate(&self, keys: &[CacheKey]) {
        if keys.is_empty() {
            return;
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
        self.evict(&rendered).await;
    }

    async fn evict(&self, keys: &[String]) {
        match self.backend.delete(keys).await {
            Ok(()) => debug!(keys = ?keys, "Cache invalidated"),
            Err(e) => warn!(keys = ?keys, kind = ?e.kind(), error = %e, "Cache invalidation failed"),
        }
    }
}

impl Default for CacheAside {
    fn default() -> Self {
        Self::in_memory(&CacheConfig::default())
    }
}

impl fmt::Debug for CacheAside {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAside").field("ttls", &self.ttls).finish_non_exhaustive()
    }
}
