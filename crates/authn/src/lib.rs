//! # PG Atlas Authentication
//!
//! GitHub Actions OIDC token verification for PG Atlas write endpoints.
//!
//! This crate provides:
//! - **Token verification**: bearer extraction, RS256 signature checks, issuer/audience/expiry
//!   enforcement and attribution claim extraction ([`OidcVerifier`])
//! - **JWKS cache**: TTL- and capacity-bounded cache of the issuer's key set ([`JwksCache`])
//! - **Algorithm validation**: only RS256 reaches signature verification
//!
//! ## Features
//!
//! - `testutil`: fixed RSA test keys and token builders
//! - `failpoints`: enables the `jwks-before-fetch` fail point
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pg_atlas_authn::{HttpJwksFetcher, JwksCache, JwksCacheConfig, OidcVerifier, VerifierConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(HttpJwksFetcher::default());
//! let cache = Arc::new(JwksCache::new(fetcher, JwksCacheConfig::default()));
//! let verifier = OidcVerifier::new(
//!     VerifierConfig::builder().audience("https://api.pg-atlas.example").build()?,
//!     cache,
//! );
//!
//! let claims = verifier.verify(Some("Bearer eyJhbGciOiJSUzI1NiIsImtpZCI6Ii4uLiJ9...")).await?;
//! println!("Verified submission from {}", claims.repository);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Cache and verifier configuration.
pub mod config;
/// Authentication error types.
pub mod error;
/// JWKS sources.
pub mod jwks;
/// TTL-bounded key-set cache.
pub mod jwks_cache;
/// JWT decoding and claims.
pub mod jwt;
/// Test helpers (requires the `testutil` feature).
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
/// Algorithm validation.
pub mod validation;
/// OIDC token verifier.
pub mod verifier;

// Re-export key types for convenience
pub use config::{
    ConfigError, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT, GITHUB_JWKS_URL,
    GITHUB_OIDC_ISSUER, JwksCacheConfig, VerifierConfig,
};
pub use error::{AuthError, AuthErrorKind, KeyResolutionError, Result, TokenRejection};
pub use jwks::{HttpJwksFetcher, JwksFetcher, MemoryJwksFetcher, SigningKeySet};
pub use jwks_cache::{JwksCache, JwksCacheMetrics};
pub use jwt::{JwtClaims, VerifiedClaims};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
pub use verifier::OidcVerifier;
