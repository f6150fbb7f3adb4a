//! GitHub Actions OIDC token verification.
//!
//! [`OidcVerifier`] is the admission gate of the write endpoints. It runs
//! the pipeline below and either returns [`VerifiedClaims`] or a classified
//! [`AuthError`]:
//!
//! ```text
//! Authorization header → "Bearer " prefix?            (Unauthenticated)
//!                      → key set from JwksCache        (KeyResolution)
//!                      → header kid → JWK → RSA key    (KeyResolution)
//!                      → RS256 signature               (TokenInvalid)
//!                      → iss, aud, repository, actor   (TokenInvalid)
//!                      → exp > now                     (TokenExpired)
//! ```
//!
//! Each failure is logged with its precise reason; callers only see the
//! coarse category.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::VerifierConfig,
    error::{AuthError, KeyResolutionError},
    jwks_cache::JwksCache,
    jwt::{VerifiedClaims, decode_jwt_header, extract_bearer_token, validate_claims, verify_signature},
    validation::{validate_algorithm, validate_kid},
};

/// Verifies GitHub Actions OIDC bearer tokens.
///
/// Holds its configuration and a shared [`JwksCache`]; both are injected at
/// construction so several verifiers (or tests) can share or substitute
/// them. Cheap to clone.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use pg_atlas_authn::{HttpJwksFetcher, JwksCache, JwksCacheConfig, OidcVerifier, VerifierConfig};
///
/// # async fn example(header: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
/// let cache = Arc::new(JwksCache::new(Arc::new(HttpJwksFetcher::default()), JwksCacheConfig::default()));
/// let config = VerifierConfig::builder().audience("https://api.pg-atlas.example").build()?;
/// let verifier = OidcVerifier::new(config, cache);
///
/// let claims = verifier.verify(header).await?;
/// println!("submitted by {} for {}", claims.actor, claims.repository);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OidcVerifier {
    config: VerifierConfig,
    cache: Arc<JwksCache>,
}

impl OidcVerifier {
    /// Creates a verifier for `config` backed by `cache`.
    #[must_use]
    pub fn new(config: VerifierConfig, cache: Arc<JwksCache>) -> Self {
        Self { config, cache }
    }

    /// Returns the verifier configuration.
    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Returns the shared key-set cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<JwksCache> {
        &self.cache
    }

    /// Verifies the raw value of an `Authorization` header.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unauthenticated`] if the header is absent or not a `Bearer` credential
    /// - otherwise see [`verify_token`](Self::verify_token)
    pub async fn verify(&self, header_value: Option<&str>) -> Result<VerifiedClaims, AuthError> {
        let token = extract_bearer_token(header_value).inspect_err(|_| {
            tracing::debug!("missing or malformed Authorization header");
        })?;
        self.verify_token(token).await
    }

    /// Verifies a bare token string.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyResolution`] if the key set cannot be obtained, the token has no `kid`, or
    ///   the set holds no usable RS256 key with that `kid`
    /// - [`AuthError::TokenInvalid`] on an undecodable token, a non-RS256 algorithm, a bad
    ///   signature, an issuer or audience mismatch, or a missing required claim
    /// - [`AuthError::TokenExpired`] if every other check passed but `exp` is not in the future
    #[tracing::instrument(skip(self, token), fields(jwks_url = %self.config.jwks_url()))]
    pub async fn verify_token(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        let result = self.verify_inner(token).await;

        match &result {
            Ok(claims) => tracing::debug!(
                repository = %claims.repository,
                actor = %claims.actor,
                "OIDC token verified"
            ),
            Err(AuthError::KeyResolution(e)) => {
                tracing::warn!(error = %e, "JWKS retrieval or key selection failed");
            },
            Err(AuthError::TokenExpired) => tracing::info!("OIDC token has expired"),
            Err(e) => tracing::warn!(error = %e, "OIDC token validation failed"),
        }

        result
    }

    async fn verify_inner(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        // 1. Resolve the signing key
        let key_set = self.cache.get(self.config.jwks_url()).await?;

        let header = decode_jwt_header(token)?;
        let kid = header.kid.ok_or(KeyResolutionError::MissingKeyId)?;
        validate_kid(&kid)?;

        let decoding_key = key_set.decoding_key(&kid)?;

        // 2. Only RS256 reaches signature verification
        validate_algorithm(&format!("{:?}", header.alg))?;
        let claims = verify_signature(token, &decoding_key)?;

        // 3-4. Issuer, audience, attribution claims, expiry
        validate_claims(claims, self.config.issuer(), self.config.audience(), Utc::now().timestamp())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        config::{GITHUB_JWKS_URL, JwksCacheConfig},
        error::{AuthErrorKind, TokenRejection},
        jwks::MemoryJwksFetcher,
        testutil::{
            PRIMARY_KID, SECONDARY_KID, TEST_ACTOR, TEST_REPOSITORY, create_signed_jwt,
            craft_raw_jwt, github_claims, test_jwks,
        },
    };

    const AUDIENCE: &str = "https://api.pg-atlas.test";

    fn verifier_with(fetcher: &MemoryJwksFetcher) -> OidcVerifier {
        let cache = Arc::new(JwksCache::new(Arc::new(fetcher.clone()), JwksCacheConfig::default()));
        let config = VerifierConfig::builder().audience(AUDIENCE).build().unwrap();
        OidcVerifier::new(config, cache)
    }

    fn github_fetcher() -> MemoryJwksFetcher {
        MemoryJwksFetcher::with_set(GITHUB_JWKS_URL, test_jwks())
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn test_valid_token_yields_claims() {
        let verifier = verifier_with(&github_fetcher());
        let token = create_signed_jwt(PRIMARY_KID, &github_claims(AUDIENCE));

        let claims = verifier.verify(Some(&bearer(&token))).await.unwrap();
        assert_eq!(claims.repository, TEST_REPOSITORY);
        assert_eq!(claims.actor, TEST_ACTOR);
        assert_eq!(claims.aud, AUDIENCE);
        assert_eq!(claims.git_ref.as_deref(), Some("refs/heads/main"));
    }

    #[tokio::test]
    async fn test_either_published_key_verifies() {
        let verifier = verifier_with(&github_fetcher());
        let token = create_signed_jwt(SECONDARY_KID, &github_claims(AUDIENCE));
        assert!(verifier.verify_token(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthenticated_without_fetch() {
        let fetcher = github_fetcher();
        let verifier = verifier_with(&fetcher);

        assert!(matches!(verifier.verify(None).await, Err(AuthError::Unauthenticated)));
        assert!(matches!(verifier.verify(Some("Basic abc")).await, Err(AuthError::Unauthenticated)));
        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_bearer_credential_is_rejected_as_token() {
        let fetcher = github_fetcher();
        let verifier = verifier_with(&fetcher);

        for header in ["Bearer ", "Bearer    "] {
            let err = verifier.verify(Some(header)).await.unwrap_err();
            assert_eq!(err.kind(), AuthErrorKind::TokenInvalid, "{header:?}");
        }

        let unreachable = github_fetcher();
        unreachable.set_failure(Some(|| KeyResolutionError::unavailable(GITHUB_JWKS_URL, "down")));
        let err = verifier_with(&unreachable).verify(Some("Bearer ")).await.unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::KeyResolution);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_key_resolution() {
        let fetcher = github_fetcher();
        fetcher.set_failure(Some(|| KeyResolutionError::unavailable(GITHUB_JWKS_URL, "unreachable")));
        let verifier = verifier_with(&fetcher);

        let err = verifier.verify(Some("Bearer bad.token.here")).await.unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::KeyResolution);
    }

    #[tokio::test]
    async fn test_unknown_kid_is_key_resolution_not_invalid() {
        let verifier = verifier_with(&github_fetcher());
        let token = create_signed_jwt("rotated-away", &github_claims(AUDIENCE));

        let err = verifier.verify_token(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::KeyResolution(KeyResolutionError::KeyNotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_kid_is_key_resolution() {
        let verifier = verifier_with(&github_fetcher());
        let token = crate::testutil::create_signed_jwt_with_key(
            crate::testutil::PRIMARY_RSA_PEM,
            None,
            &github_claims(AUDIENCE),
        );

        let err = verifier.verify_token(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::KeyResolution(KeyResolutionError::MissingKeyId)));
    }

    #[tokio::test]
    async fn test_undecodable_token_is_invalid() {
        let verifier = verifier_with(&github_fetcher());
        let err = verifier.verify(Some("Bearer bad.token.here")).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(TokenRejection::Malformed(_))));
    }

    #[tokio::test]
    async fn test_expired_token_is_distinct() {
        let verifier = verifier_with(&github_fetcher());
        let mut payload = github_claims(AUDIENCE);
        payload["exp"] = json!(Utc::now().timestamp() - 10);
        let token = create_signed_jwt(PRIMARY_KID, &payload);

        let err = verifier.verify_token(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn test_wrong_audience_is_invalid() {
        let verifier = verifier_with(&github_fetcher());
        let token = create_signed_jwt(PRIMARY_KID, &github_claims("https://someone-else.test"));

        let err = verifier.verify_token(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(TokenRejection::InvalidAudience(_))));
    }

    #[tokio::test]
    async fn test_alg_none_is_invalid() {
        let verifier = verifier_with(&github_fetcher());
        let token = craft_raw_jwt(
            &json!({"alg": "none", "typ": "JWT", "kid": PRIMARY_KID}),
            &github_claims(AUDIENCE),
        );

        let err = verifier.verify_token(&token).await.unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::TokenInvalid);
    }

    #[tokio::test]
    async fn test_key_set_is_fetched_once_across_verifications() {
        let fetcher = github_fetcher();
        let verifier = verifier_with(&fetcher);
        let token = create_signed_jwt(PRIMARY_KID, &github_claims(AUDIENCE));

        for _ in 0..5 {
            verifier.verify_token(&token).await.unwrap();
        }
        // Failures do not evict either.
        let _ = verifier.verify_token(&create_signed_jwt("rotated-away", &github_claims(AUDIENCE))).await;

        assert_eq!(fetcher.fetch_count(), 1);
    }
}
