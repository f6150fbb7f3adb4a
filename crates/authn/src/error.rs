//! Authentication error types.
//!
//! Errors are split in two layers. [`AuthError`] carries the four coarse
//! categories that are visible at the HTTP boundary. The inner
//! [`KeyResolutionError`] and [`TokenRejection`] enums record the precise
//! reason for server-side logging only: callers must not learn whether a
//! key-set fetch failed, timed out, or simply lacked the token's `kid`.

use std::time::Duration;

use thiserror::Error;

/// Authentication errors produced by [`OidcVerifier`](crate::OidcVerifier).
///
/// # Non-exhaustive
///
/// New variants may be added in minor releases. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No credential was presented, or the `Authorization` header does not
    /// use the `Bearer` scheme.
    #[error("Missing or malformed Authorization header")]
    Unauthenticated,

    /// The issuer's key set could not be obtained, or holds no usable key
    /// for the token.
    #[error("Key resolution failed: {0}")]
    KeyResolution(#[from] KeyResolutionError),

    /// Signature, issuer, audience, algorithm, or required-claim failure.
    #[error("Invalid token: {0}")]
    TokenInvalid(#[from] TokenRejection),

    /// The token passed every other check but its `exp` is not in the future.
    #[error("Token expired")]
    TokenExpired,
}

/// Coarse classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// See [`AuthError::Unauthenticated`].
    Unauthenticated,
    /// See [`AuthError::KeyResolution`].
    KeyResolution,
    /// See [`AuthError::TokenInvalid`].
    TokenInvalid,
    /// See [`AuthError::TokenExpired`].
    TokenExpired,
}

impl AuthError {
    /// Returns the boundary category of this error.
    #[must_use]
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::Unauthenticated => AuthErrorKind::Unauthenticated,
            Self::KeyResolution(_) => AuthErrorKind::KeyResolution,
            Self::TokenInvalid(_) => AuthErrorKind::TokenInvalid,
            Self::TokenExpired => AuthErrorKind::TokenExpired,
        }
    }

    /// Creates a [`TokenRejection::Malformed`] error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::TokenInvalid(TokenRejection::Malformed(message.into()))
    }

    /// Creates a [`TokenRejection::MissingClaim`] error.
    #[must_use]
    pub fn missing_claim(claim: &'static str) -> Self {
        Self::TokenInvalid(TokenRejection::MissingClaim(claim))
    }
}

/// Why the issuer's signing key could not be resolved.
///
/// Every failure mode of the HTTP client, the JWKS decoding, and the key
/// selection maps to exactly one variant.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyResolutionError {
    /// The HTTP request to the JWKS endpoint failed before a response arrived.
    #[error("JWKS request to {url} failed")]
    Transport {
        /// JWKS endpoint URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The JWKS fetch did not complete within the configured timeout.
    #[error("JWKS request to {url} timed out after {timeout:?}")]
    Timeout {
        /// JWKS endpoint URL.
        url: String,
        /// Configured fetch timeout.
        timeout: Duration,
    },

    /// The JWKS endpoint answered with a non-success status.
    #[error("JWKS endpoint {url} returned HTTP {status}")]
    HttpStatus {
        /// JWKS endpoint URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body is not a valid JWKS document.
    #[error("JWKS document from {url} is malformed")]
    MalformedJwks {
        /// JWKS endpoint URL.
        url: String,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// The key source is unavailable for a reason outside the HTTP client
    /// (in-memory sources and injected faults).
    #[error("JWKS source {url} unavailable: {message}")]
    Unavailable {
        /// JWKS endpoint URL.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// The token header carries no `kid`.
    #[error("Token header has no 'kid'")]
    MissingKeyId,

    /// The key set holds no key with the token's `kid`.
    #[error("Signing key not found: {kid}")]
    KeyNotFound {
        /// Key ID from the token header.
        kid: String,
    },

    /// The key exists but cannot verify RS256 signatures.
    #[error("Signing key {kid} is unusable: {reason}")]
    UnusableKey {
        /// Key ID from the token header.
        kid: String,
        /// Why the key was refused.
        reason: String,
    },
}

impl KeyResolutionError {
    /// Creates an [`Unavailable`](Self::Unavailable) error.
    #[must_use]
    pub fn unavailable(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable { url: url.into(), message: message.into() }
    }

    /// Creates a [`KeyNotFound`](Self::KeyNotFound) error.
    #[must_use]
    pub fn key_not_found(kid: impl Into<String>) -> Self {
        Self::KeyNotFound { kid: kid.into() }
    }
}

/// Why an otherwise-resolvable token was rejected.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenRejection {
    /// The token is not a decodable JWS compact serialization.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The header declares an algorithm other than the issuer's.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Signature does not verify against the resolved key.
    #[error("invalid signature")]
    InvalidSignature,

    /// `iss` does not equal the expected issuer.
    #[error("invalid issuer: {0}")]
    InvalidIssuer(String),

    /// `aud` does not equal the configured audience.
    #[error("invalid audience: {0}")]
    InvalidAudience(String),

    /// A required claim is absent or empty.
    #[error("missing claim: {0}")]
    MissingClaim(&'static str),
}

impl From<jsonwebtoken::errors::Error> for TokenRejection {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => TokenRejection::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenRejection::UnsupportedAlgorithm("algorithm not accepted".into())
            },
            ErrorKind::InvalidAudience => TokenRejection::InvalidAudience("audience mismatch".into()),
            ErrorKind::InvalidIssuer => TokenRejection::InvalidIssuer("issuer mismatch".into()),
            _ => TokenRejection::Malformed(err.to_string()),
        }
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
