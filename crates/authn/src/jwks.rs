//! JWKS sources.
//!
//! [`JwksFetcher`] abstracts where an issuer's published key set comes from
//! so that production ([`HttpJwksFetcher`]) and testing
//! ([`MemoryJwksFetcher`]) share one interface with [`JwksCache`](crate::JwksCache).
//!
//! A fetcher performs exactly one attempt per call. Retries, caching and the
//! overall timeout belong to the cache.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use jsonwebtoken::{
    Algorithm, DecodingKey,
    jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse},
};
use parking_lot::RwLock;

use crate::{config::DEFAULT_FETCH_TIMEOUT, error::KeyResolutionError};

/// Source of an issuer's published key set.
#[async_trait]
pub trait JwksFetcher: Send + Sync {
    /// Fetches the key set published at `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyResolutionError`] describing why no key set could be
    /// obtained. Implementations must not panic on bad input from the
    /// remote side.
    async fn fetch(&self, url: &str) -> Result<JwkSet, KeyResolutionError>;
}

/// One fetched key set, as stored in [`JwksCache`](crate::JwksCache).
///
/// Entries are replaced wholesale on refresh; the key list is never merged
/// with a previous fetch.
#[derive(Debug, Clone)]
pub struct SigningKeySet {
    url: String,
    fetched_at: Instant,
    keys: JwkSet,
}

impl SigningKeySet {
    /// Wraps a freshly fetched key set.
    #[must_use]
    pub fn new(url: impl Into<String>, keys: JwkSet) -> Self {
        Self { url: url.into(), fetched_at: Instant::now(), keys }
    }

    /// Returns the endpoint this set was fetched from.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns when this set was fetched.
    #[must_use]
    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// Returns the number of keys in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.keys.len()
    }

    /// Returns `true` if the set holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.keys.is_empty()
    }

    /// Returns the raw key set.
    #[must_use]
    pub fn keys(&self) -> &JwkSet {
        &self.keys
    }

    /// Selects the key with the given `kid` and converts it for RS256
    /// verification.
    ///
    /// # Errors
    ///
    /// - [`KeyResolutionError::KeyNotFound`] if no key carries `kid`
    /// - [`KeyResolutionError::UnusableKey`] if the key is not an RSA signing
    ///   key, declares an algorithm other than RS256, or has invalid components
    pub fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeyResolutionError> {
        let jwk = self.keys.find(kid).ok_or_else(|| KeyResolutionError::key_not_found(kid))?;
        to_decoding_key(kid, jwk)
    }
}

/// Converts a JWK into a decoding key usable with [`Algorithm::RS256`].
fn to_decoding_key(kid: &str, jwk: &Jwk) -> Result<DecodingKey, KeyResolutionError> {
    let unusable = |reason: String| KeyResolutionError::UnusableKey { kid: kid.to_owned(), reason };

    if let Some(alg) = &jwk.common.key_algorithm
        && *alg != KeyAlgorithm::RS256
    {
        return Err(unusable(format!("declared algorithm {alg:?}, expected {:?}", Algorithm::RS256)));
    }

    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return Err(unusable("key is published for encryption, not signatures".to_owned()));
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| unusable(format!("invalid RSA components: {e}"))),
        AlgorithmParameters::EllipticCurve(_) => Err(unusable("EC key".to_owned())),
        AlgorithmParameters::OctetKey(_) => Err(unusable("symmetric key".to_owned())),
        AlgorithmParameters::OctetKeyPair(_) => Err(unusable("OKP key".to_owned())),
    }
}

/// Fetches key sets over HTTPS with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpJwksFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for HttpJwksFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl HttpJwksFetcher {
    /// Creates a fetcher with its own client and a per-request timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    /// Creates a fetcher sharing an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn map_request_error(&self, url: &str, err: reqwest::Error) -> KeyResolutionError {
        if err.is_timeout() {
            KeyResolutionError::Timeout { url: url.to_owned(), timeout: self.timeout }
        } else {
            KeyResolutionError::Transport { url: url.to_owned(), source: err }
        }
    }
}

#[async_trait]
impl JwksFetcher for HttpJwksFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<JwkSet, KeyResolutionError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeyResolutionError::HttpStatus { url: url.to_owned(), status: status.as_u16() });
        }

        let body = response.bytes().await.map_err(|e| self.map_request_error(url, e))?;

        let keys: JwkSet = serde_json::from_slice(&body)
            .map_err(|source| KeyResolutionError::MalformedJwks { url: url.to_owned(), source })?;

        tracing::debug!(keys = keys.keys.len(), "fetched JWKS");
        Ok(keys)
    }
}

/// In-memory key-set source.
///
/// Holds one key set per URL and records how often it was asked, with
/// optional artificial latency and failure injection. Cloning shares state.
///
/// # Example
///
/// ```
/// use jsonwebtoken::jwk::JwkSet;
/// use pg_atlas_authn::{JwksFetcher, MemoryJwksFetcher};
///
/// # tokio_test_block_on(async {
/// let fetcher = MemoryJwksFetcher::new();
/// fetcher.insert("https://issuer/jwks", JwkSet { keys: vec![] });
///
/// let set = fetcher.fetch("https://issuer/jwks").await.expect("published");
/// assert!(set.keys.is_empty());
/// assert_eq!(fetcher.fetch_count(), 1);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryJwksFetcher {
    sets: Arc<RwLock<HashMap<String, JwkSet>>>,
    fetch_count: Arc<AtomicUsize>,
    delay: Arc<RwLock<Duration>>,
    fail_with: Arc<RwLock<Option<fn() -> KeyResolutionError>>>,
}

impl MemoryJwksFetcher {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source publishing `keys` at `url`.
    #[must_use]
    pub fn with_set(url: impl Into<String>, keys: JwkSet) -> Self {
        let fetcher = Self::new();
        fetcher.insert(url, keys);
        fetcher
    }

    /// Publishes (or replaces) the key set at `url`.
    pub fn insert(&self, url: impl Into<String>, keys: JwkSet) {
        self.sets.write().insert(url.into(), keys);
    }

    /// Removes the key set at `url`.
    pub fn remove(&self, url: &str) {
        self.sets.write().remove(url);
    }

    /// Returns how many times [`fetch`](JwksFetcher::fetch) was called.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Resets the fetch counter.
    pub fn reset_count(&self) {
        self.fetch_count.store(0, Ordering::SeqCst);
    }

    /// Delays every subsequent fetch by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write() = delay;
    }

    /// Makes every subsequent fetch fail with the error built by `factory`,
    /// or restores normal behaviour with `None`.
    pub fn set_failure(&self, factory: Option<fn() -> KeyResolutionError>) {
        *self.fail_with.write() = factory;
    }
}

#[async_trait]
impl JwksFetcher for MemoryJwksFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<JwkSet, KeyResolutionError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(factory) = *self.fail_with.read() {
            return Err(factory());
        }

        self.sets
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| KeyResolutionError::HttpStatus { url: url.to_owned(), status: 404 })
    }
}
