//! Configuration for the key-set cache and the token verifier.
//!
//! Both values are constructed once at process start and passed to
//! [`JwksCache::new`](crate::JwksCache::new) and
//! [`OidcVerifier::new`](crate::OidcVerifier::new).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Issuer of GitHub Actions OIDC tokens.
pub const GITHUB_OIDC_ISSUER: &str = "https://token.actions.githubusercontent.com";

/// JWKS endpoint published by [`GITHUB_OIDC_ISSUER`].
pub const GITHUB_JWKS_URL: &str = "https://token.actions.githubusercontent.com/.well-known/jwks";

/// Default key-set TTL (1 hour). GitHub rotates its OIDC keys infrequently.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3_600);

/// Default number of distinct JWKS endpoints the cache holds.
pub const DEFAULT_CACHE_CAPACITY: u64 = 4;

/// Default bound on a single JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric or duration field is below its minimum.
    #[error("{field} must be at least {min} (got {value})")]
    BelowMinimum {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: String,
        /// Minimum accepted value.
        min: String,
    },

    /// A required string field is empty.
    #[error("{field} cannot be empty")]
    Empty {
        /// Field name.
        field: &'static str,
    },
}

/// Configuration for [`JwksCache`](crate::JwksCache).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use pg_atlas_authn::JwksCacheConfig;
///
/// let config = JwksCacheConfig::builder().ttl(Duration::from_secs(600)).build()?;
/// assert_eq!(config.capacity(), 4);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JwksCacheConfig {
    /// Time after which a fetched key set is treated as absent.
    #[serde(with = "humantime_serde", default = "default_ttl")]
    pub(crate) ttl: Duration,

    /// Maximum number of distinct JWKS endpoints cached at once.
    #[serde(default = "default_capacity")]
    pub(crate) capacity: u64,

    /// Bound on a single key-set fetch.
    #[serde(with = "humantime_serde", default = "default_fetch_timeout")]
    pub(crate) fetch_timeout: Duration,
}

fn default_ttl() -> Duration {
    DEFAULT_CACHE_TTL
}

fn default_capacity() -> u64 {
    DEFAULT_CACHE_CAPACITY
}

fn default_fetch_timeout() -> Duration {
    DEFAULT_FETCH_TIMEOUT
}

impl Default for JwksCacheConfig {
    fn default() -> Self {
        Self { ttl: default_ttl(), capacity: default_capacity(), fetch_timeout: default_fetch_timeout() }
    }
}

#[bon::bon]
impl JwksCacheConfig {
    /// Creates a validated cache configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if `ttl`, `capacity` or
    /// `fetch_timeout` is zero.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_CACHE_TTL)] ttl: Duration,
        #[builder(default = DEFAULT_CACHE_CAPACITY)] capacity: u64,
        #[builder(default = DEFAULT_FETCH_TIMEOUT)] fetch_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let config = Self { ttl, capacity, fetch_timeout };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants enforced by [`new`](Self::new).
    ///
    /// Deserialized configurations bypass the builder, so callers loading
    /// from a file should call this before use.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::BelowMinimum {
                field: "ttl",
                value: "0s".to_owned(),
                min: "1ms".to_owned(),
            });
        }
        if self.capacity == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "capacity",
                value: "0".to_owned(),
                min: "1".to_owned(),
            });
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::BelowMinimum {
                field: "fetch_timeout",
                value: "0s".to_owned(),
                min: "1ms".to_owned(),
            });
        }
        Ok(())
    }

    /// Returns the key-set TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the endpoint capacity.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Returns the fetch timeout.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }
}

/// Identity expectations enforced by [`OidcVerifier`](crate::OidcVerifier).
///
/// # Example
///
/// ```
/// use pg_atlas_authn::{GITHUB_OIDC_ISSUER, VerifierConfig};
///
/// let config = VerifierConfig::builder().audience("https://api.pg-atlas.example").build()?;
/// assert_eq!(config.issuer(), GITHUB_OIDC_ISSUER);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    issuer: String,
    jwks_url: String,
    audience: String,
}

#[bon::bon]
impl VerifierConfig {
    /// Creates a validated verifier configuration.
    ///
    /// # Arguments
    ///
    /// * `audience` - Canonical URL of this deployment; tokens must carry exactly this `aud`.
    /// * `issuer` - Expected `iss` (default: [`GITHUB_OIDC_ISSUER`]).
    /// * `jwks_url` - Key-set endpoint of the issuer (default: [`GITHUB_JWKS_URL`]).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Empty`] if any field is empty.
    #[builder]
    pub fn new(
        #[builder(into)] audience: String,
        #[builder(into, default = GITHUB_OIDC_ISSUER.to_owned())] issuer: String,
        #[builder(into, default = GITHUB_JWKS_URL.to_owned())] jwks_url: String,
    ) -> Result<Self, ConfigError> {
        if audience.is_empty() {
            return Err(ConfigError::Empty { field: "audience" });
        }
        if issuer.is_empty() {
            return Err(ConfigError::Empty { field: "issuer" });
        }
        if jwks_url.is_empty() {
            return Err(ConfigError::Empty { field: "jwks_url" });
        }
        Ok(Self { issuer, jwks_url, audience })
    }

    /// Returns the expected issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the issuer's JWKS endpoint.
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Returns the expected audience.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }
}
