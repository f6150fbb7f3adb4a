//! JWT header validation.
//!
//! This module provides security checks for the algorithm and key ID a token
//! declares in its header, before any signature work is done.
//!
//! # Security
//!
//! - The issuer signs with RS256 only; any other declared algorithm is refused so that algorithm
//!   confusion (HMAC keyed with the RSA public key, or `none`) cannot reach verification
//! - Symmetric algorithms and "none" are always rejected

use crate::error::{AuthError, KeyResolutionError, TokenRejection};

/// Forbidden JWT algorithms that are never accepted for security reasons.
///
/// These algorithms are blocked because:
/// - `none`: No signature verification (trivially bypassable)
/// - `HS256`, `HS384`, `HS512`: Symmetric algorithms (shared secret vulnerability)
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Accepted JWT algorithms.
///
/// GitHub Actions' OIDC provider publishes RSA keys and signs every token
/// with RS256, so that is the only algorithm the verifier will run.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["RS256"];

/// Maximum accepted length of a `kid` header value.
pub const MAX_KID_LENGTH: usize = 256;

/// Validate JWT algorithm against security policies.
///
/// # Errors
///
/// Returns [`TokenRejection::UnsupportedAlgorithm`] if:
/// - Algorithm is symmetric (HS256, HS384, HS512)
/// - Algorithm is "none"
/// - Algorithm is not in [`ACCEPTED_ALGORITHMS`]
///
/// # Examples
///
/// ```
/// use pg_atlas_authn::validation::validate_algorithm;
///
/// assert!(validate_algorithm("RS256").is_ok());
/// assert!(validate_algorithm("ES256").is_err());
/// assert!(validate_algorithm("HS256").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(TokenRejection::UnsupportedAlgorithm(format!(
            "Algorithm '{}' is not allowed for security reasons",
            alg
        ))
        .into());
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(TokenRejection::UnsupportedAlgorithm(format!(
            "Algorithm '{}' is not in accepted list (only RS256 is supported)",
            alg
        ))
        .into());
    }

    Ok(())
}

/// Validate the `kid` header value before it is used as a lookup key.
///
/// # Errors
///
/// Returns [`KeyResolutionError::MissingKeyId`] if the value is empty, and
/// [`KeyResolutionError::KeyNotFound`] if it is longer than
/// [`MAX_KID_LENGTH`] or contains control characters (no published key can
/// match such a value).
pub fn validate_kid(kid: &str) -> Result<(), AuthError> {
    if kid.is_empty() {
        return Err(KeyResolutionError::MissingKeyId.into());
    }

    if kid.len() > MAX_KID_LENGTH || kid.chars().any(char::is_control) {
        let shown: String = kid.chars().take(32).filter(|c| !c.is_control()).collect();
        return Err(KeyResolutionError::key_not_found(shown).into());
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::AuthErrorKind;

    #[test]
    fn test_validate_algorithm_rs256_accepted() {
        assert!(validate_algorithm("RS256").is_ok());
    }

    #[test]
    fn test_validate_algorithm_other_asymmetric_rejected() {
        for alg in ["RS384", "RS512", "PS256", "ES256", "EdDSA"] {
            let result = validate_algorithm(alg);
            assert!(
                matches!(
                    result,
                    Err(AuthError::TokenInvalid(TokenRejection::UnsupportedAlgorithm(ref msg)))
                        if msg.contains("not in accepted list")
                ),
                "expected '{alg}' to be outside the accepted list"
            );
        }
    }

    #[test]
    fn test_forbidden_algorithms_each_rejected_with_security_message() {
        for alg in FORBIDDEN_ALGORITHMS {
            let result = validate_algorithm(alg);
            assert!(
                matches!(
                    result,
                    Err(AuthError::TokenInvalid(TokenRejection::UnsupportedAlgorithm(ref msg)))
                        if msg.contains("not allowed for security reasons")
                ),
                "Expected security rejection for forbidden algorithm '{alg}'"
            );
        }
    }

    #[test]
    fn test_accepted_algorithms_constant() {
        assert_eq!(ACCEPTED_ALGORITHMS, &["RS256"]);
    }

    #[test]
    fn test_validate_kid() {
        assert!(validate_kid("cc413527-173f-5a05-976e-9c52b1d7b431").is_ok());

        let empty = validate_kid("");
        assert!(matches!(empty, Err(AuthError::KeyResolution(KeyResolutionError::MissingKeyId))));

        let long = "k".repeat(MAX_KID_LENGTH + 1);
        assert_eq!(validate_kid(&long).unwrap_err().kind(), AuthErrorKind::KeyResolution);

        assert_eq!(validate_kid("bad\u{0}kid").unwrap_err().kind(), AuthErrorKind::KeyResolution);
    }
}
