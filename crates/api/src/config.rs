//! Server settings, read from CLI flags or `PG_ATLAS_*` environment variables.

use std::{net::SocketAddr, time::Duration};

use clap::Parser;
use pg_atlas_authn::{ConfigError, JwksCacheConfig, VerifierConfig};
use thiserror::Error;

/// Default request body limit for SBOM uploads (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// PG Atlas API server
#[derive(Debug, Clone, Parser)]
#[command(name = "pg-atlas", version, about, long_about = None)]
pub struct Settings {
    /// Canonical deployment URL; OIDC tokens must carry it as their audience.
    #[arg(long, env = "PG_ATLAS_API_URL")]
    pub api_url: String,

    /// Lifetime of a cached JWKS, in seconds.
    #[arg(long, env = "PG_ATLAS_JWKS_CACHE_TTL_SECONDS", default_value_t = 3600)]
    pub jwks_cache_ttl_seconds: u64,

    /// Upper bound on a single JWKS fetch, in seconds.
    #[arg(long, env = "PG_ATLAS_JWKS_FETCH_TIMEOUT_SECONDS", default_value_t = 10)]
    pub jwks_fetch_timeout_seconds: u64,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "PG_ATLAS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Address to listen on.
    #[arg(long, env = "PG_ATLAS_BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: SocketAddr,

    /// Maximum accepted request body size, in bytes.
    #[arg(long, env = "PG_ATLAS_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Database connection string. Accepted but not used yet.
    #[arg(long, env = "PG_ATLAS_DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,
}

/// Invalid server settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    /// `api_url` is empty.
    #[error("PG_ATLAS_API_URL must not be empty")]
    EmptyApiUrl,

    /// `api_url` is not an absolute URL.
    #[error("PG_ATLAS_API_URL is not a valid URL: {url}")]
    InvalidApiUrl {
        /// The rejected value.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },

    /// `max_body_bytes` is zero.
    #[error("PG_ATLAS_MAX_BODY_BYTES must be greater than zero")]
    ZeroBodyLimit,

    /// A cache or verifier setting was rejected.
    #[error(transparent)]
    Component(#[from] ConfigError),
}

impl Settings {
    /// Checks every setting and builds nothing.
    ///
    /// # Errors
    ///
    /// Returns the first [`SettingsError`] found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.api_url.trim().is_empty() {
            return Err(SettingsError::EmptyApiUrl);
        }
        url::Url::parse(&self.api_url).map_err(|source| SettingsError::InvalidApiUrl {
            url: self.api_url.clone(),
            source,
        })?;
        if self.max_body_bytes == 0 {
            return Err(SettingsError::ZeroBodyLimit);
        }
        self.cache_config()?;
        Ok(())
    }

    /// JWKS cache configuration derived from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Component`] for a zero TTL or timeout.
    pub fn cache_config(&self) -> Result<JwksCacheConfig, SettingsError> {
        Ok(JwksCacheConfig::builder()
            .ttl(Duration::from_secs(self.jwks_cache_ttl_seconds))
            .fetch_timeout(Duration::from_secs(self.jwks_fetch_timeout_seconds))
            .build()?)
    }

    /// Verifier configuration for GitHub Actions tokens addressed to
    /// `api_url`. The URL is compared verbatim, without normalization.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Component`] for an empty audience.
    pub fn verifier_config(&self) -> Result<VerifierConfig, SettingsError> {
        Ok(VerifierConfig::builder().audience(self.api_url.as_str()).build()?)
    }
}
