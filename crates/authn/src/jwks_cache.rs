//! TTL-bounded cache of issuer key sets.
//!
//! [`JwksCache`] wraps a [`JwksFetcher`] with an in-memory `moka` cache keyed
//! by JWKS endpoint URL, so that token verification only reaches the
//! network once per TTL window.
//!
//! # Architecture
//!
//! ```text
//! token arrives → cache lookup by JWKS URL
//!               → miss or expired? fetch via JwksFetcher (bounded by fetch_timeout)
//!               → store Arc<SigningKeySet>, replacing any previous entry
//!               → caller selects the key by kid
//! ```
//!
//! # Cache Strategy
//!
//! - **TTL**: default 3600 seconds; an entry older than the TTL is treated as absent
//! - **Capacity**: default 4 endpoints, evicted by moka's admission policy
//! - **No invalidation on failure**: a signature failure or unknown `kid` never evicts the entry
//! - **No fetch coalescing**: concurrent misses for one URL may each fetch; the last insert wins

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use fail::fail_point;
use moka::future::Cache;

use crate::{
    config::JwksCacheConfig,
    error::KeyResolutionError,
    jwks::{JwksFetcher, SigningKeySet},
};

/// Point-in-time counters of a [`JwksCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JwksCacheMetrics {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that required a fetch.
    pub misses: u64,
    /// Fetches that failed or timed out.
    pub fetch_errors: u64,
}

/// Cache of issuer key sets keyed by JWKS URL.
///
/// Constructed once at process start and shared (behind an [`Arc`]) by every
/// verifier. Safe for concurrent use.
pub struct JwksCache {
    cache: Cache<String, Arc<SigningKeySet>>,
    fetcher: Arc<dyn JwksFetcher>,
    config: JwksCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    fetch_errors: AtomicU64,
}

impl std::fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksCache")
            .field("config", &self.config)
            .field("entry_count", &self.cache.entry_count())
            .field("metrics", &self.metrics())
            .finish_non_exhaustive()
    }
}

impl JwksCache {
    /// Creates a cache backed by `fetcher`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use pg_atlas_authn::{JwksCache, JwksCacheConfig, MemoryJwksFetcher};
    ///
    /// let cache = JwksCache::new(Arc::new(MemoryJwksFetcher::new()), JwksCacheConfig::default());
    /// assert_eq!(cache.entry_count(), 0);
    /// ```
    #[must_use]
    pub fn new(fetcher: Arc<dyn JwksFetcher>, config: JwksCacheConfig) -> Self {
        Self {
            cache: Cache::builder()
                .time_to_live(config.ttl())
                .max_capacity(config.capacity())
                .build(),
            fetcher,
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fetch_errors: AtomicU64::new(0),
        }
    }

    /// Returns the key set published at `url`, fetching it on a miss.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's [`KeyResolutionError`] if the set cannot be
    /// obtained, or [`KeyResolutionError::Timeout`] if the fetch exceeds the
    /// configured timeout. Failures are not cached.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, url: &str) -> Result<Arc<SigningKeySet>, KeyResolutionError> {
        if let Some(set) = self.cache.get(url).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(cache = "jwks", "cache hit");
            return Ok(set);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(cache = "jwks", "cache miss");

        let set = self.fetch(url).await.inspect_err(|e| {
            self.fetch_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "JWKS fetch failed");
        })?;

        self.cache.insert(url.to_owned(), Arc::clone(&set)).await;
        tracing::debug!(cache = "jwks", keys = set.len(), "cache populated");

        Ok(set)
    }

    async fn fetch(&self, url: &str) -> Result<Arc<SigningKeySet>, KeyResolutionError> {
        fail_point!("jwks-before-fetch", |_| {
            Err(KeyResolutionError::unavailable(url, "injected failure before JWKS fetch"))
        });

        let timeout = self.config.fetch_timeout();
        let keys = tokio::time::timeout(timeout, self.fetcher.fetch(url))
            .await
            .map_err(|_| KeyResolutionError::Timeout { url: url.to_owned(), timeout })??;

        Ok(Arc::new(SigningKeySet::new(url, keys)))
    }

    /// Returns the configuration this cache was built with.
    #[must_use]
    pub fn config(&self) -> &JwksCacheConfig {
        &self.config
    }

    /// Returns the number of cached endpoints.
    ///
    /// Note: This count is eventually consistent. For accurate counts in tests,
    /// call `sync` first.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Returns a snapshot of the hit/miss/error counters.
    #[must_use]
    pub fn metrics(&self) -> JwksCacheMetrics {
        JwksCacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
        }
    }

    /// Synchronizes pending cache operations.
    ///
    /// Call this before checking entry counts in tests to ensure
    /// all inserts, expirations and evictions have been processed.
    #[cfg(any(test, feature = "testutil"))]
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}
