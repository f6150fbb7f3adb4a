//! JWT decoding and GitHub Actions OIDC claims.
//!
//! This module provides the building blocks [`OidcVerifier`](crate::OidcVerifier)
//! composes: bearer extraction, header decoding, RS256 signature
//! verification, and claim validation.
//!
//! # Example
//!
//! ```no_run
//! // Requires a real GitHub Actions token.
//! use pg_atlas_authn::jwt::{decode_jwt_header, extract_bearer_token};
//!
//! # fn example(header_value: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let token = extract_bearer_token(Some(header_value))?;
//! let header = decode_jwt_header(token)?;
//!
//! println!("Algorithm: {:?}", header.alg);
//! println!("Key ID: {:?}", header.kid);
//! # Ok(())
//! # }
//! ```

use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, decode_header};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AuthError, TokenRejection};

/// Authorization scheme prefix, including the separating space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Claims of a GitHub Actions OIDC token as found in the payload, before
/// validation.
///
/// Every field is optional here so that a missing claim is reported as
/// [`TokenRejection::MissingClaim`] rather than as a decoding failure.
/// Optional GitHub claims with an unexpected JSON type are dropped rather
/// than rejected.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct JwtClaims {
    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience; GitHub sets a single string.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    /// Expiration time (seconds since epoch).
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub exp: Option<i64>,
    /// Submitting repository, `owner/name`.
    #[serde(default)]
    pub repository: Option<String>,
    /// User that triggered the workflow run.
    #[serde(default)]
    pub actor: Option<String>,
    /// Subject, e.g. `repo:owner/name:ref:refs/heads/main`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub sub: Option<String>,
    /// Owner of the submitting repository.
    #[serde(default, deserialize_with = "lenient_string")]
    pub repository_owner: Option<String>,
    /// Numeric repository ID.
    #[serde(default, deserialize_with = "lenient_string")]
    pub repository_id: Option<String>,
    /// Git ref the workflow ran on.
    #[serde(default, rename = "ref", deserialize_with = "lenient_string")]
    pub git_ref: Option<String>,
    /// Commit SHA the workflow ran on.
    #[serde(default, deserialize_with = "lenient_string")]
    pub sha: Option<String>,
    /// Workflow name.
    #[serde(default, deserialize_with = "lenient_string")]
    pub workflow: Option<String>,
    /// Event that triggered the workflow.
    #[serde(default, deserialize_with = "lenient_string")]
    pub event_name: Option<String>,
    /// Workflow run ID.
    #[serde(default, deserialize_with = "lenient_string")]
    pub run_id: Option<String>,
    /// JWT ID.
    #[serde(default, deserialize_with = "lenient_string")]
    pub jti: Option<String>,
    /// Issued at (seconds since epoch).
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub iat: Option<i64>,
    /// Not before (seconds since epoch).
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub nbf: Option<i64>,
}

/// Identity claims of a token that passed every check.
///
/// An instance only exists once signature, issuer, audience, required
/// claims and expiry have all been validated. Serializes with the original
/// claim names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    /// Issuer; equals the configured issuer.
    pub iss: String,
    /// Audience; equals the configured deployment URL.
    pub aud: String,
    /// Expiration time (seconds since epoch), in the future at verification time.
    pub exp: i64,
    /// Submitting repository, `owner/name`.
    pub repository: String,
    /// User that triggered the workflow run.
    pub actor: String,
    /// Subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Owner of the submitting repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_owner: Option<String>,
    /// Numeric repository ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<String>,
    /// Git ref the workflow ran on.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    /// Commit SHA the workflow ran on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    /// Workflow name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    /// Event that triggered the workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    /// Workflow run ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// JWT ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Issued at (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Not before (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Number(n)) => {
            n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
        },
        _ => None,
    })
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme prefix is matched exactly (`"Bearer "`, case-sensitive), as
/// GitHub's toolkit sends it.
///
/// # Errors
///
/// Returns [`AuthError::Unauthenticated`] if the header is absent or does
/// not start with `"Bearer "`. Whatever follows the prefix, even nothing, is
/// returned as the token and rejected later as malformed.
///
/// # Examples
///
/// ```
/// use pg_atlas_authn::jwt::extract_bearer_token;
///
/// assert_eq!(extract_bearer_token(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
/// assert!(extract_bearer_token(Some("Basic dXNlcjpwYXNz")).is_err());
/// assert!(extract_bearer_token(None).is_err());
/// ```
pub fn extract_bearer_token(header_value: Option<&str>) -> Result<&str, AuthError> {
    header_value
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthError::Unauthenticated)
}

/// Decode JWT header without verification.
///
/// # Errors
///
/// Returns [`TokenRejection::Malformed`] if the header cannot be decoded.
pub fn decode_jwt_header(token: &str) -> Result<Header, AuthError> {
    decode_header(token)
        .map_err(|e| AuthError::malformed(format!("Failed to decode JWT header: {}", e)))
}

/// Verify the RS256 signature and decode the payload.
///
/// Only the signature and algorithm are checked here; claims are validated
/// afterwards by [`validate_claims`] so that an expired token is reported as
/// such only once everything else has passed.
///
/// # Errors
///
/// Returns [`AuthError::TokenInvalid`] if the signature does not verify, the
/// header declares another algorithm, or the payload is not a JSON object.
pub fn verify_signature(token: &str, key: &DecodingKey) -> Result<JwtClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<JwtClaims>(token, key, &validation).map_err(TokenRejection::from)?;

    Ok(token_data.claims)
}

/// Validate decoded claims against the expected issuer and audience.
///
/// Checks run in this order: issuer, audience, required attribution claims,
/// then expiry. `exp` must be strictly greater than `now`; there is no leeway.
///
/// # Arguments
///
/// * `claims` - Claims returned by [`verify_signature`]
/// * `expected_issuer` - Exact `iss` value to accept
/// * `expected_audience` - Exact `aud` value to accept
/// * `now` - Verification time in seconds since epoch
///
/// # Errors
///
/// - [`TokenRejection::MissingClaim`] if `iss`, `aud`, `exp`, `repository` or `actor` is absent or
///   empty
/// - [`TokenRejection::InvalidIssuer`] / [`TokenRejection::InvalidAudience`] on mismatch (an array
///   `aud` never matches)
/// - [`AuthError::TokenExpired`] if `exp <= now`
pub fn validate_claims(
    claims: JwtClaims,
    expected_issuer: &str,
    expected_audience: &str,
    now: i64,
) -> Result<VerifiedClaims, AuthError> {
    let iss = non_empty(claims.iss).ok_or_else(|| AuthError::missing_claim("iss"))?;
    if iss != expected_issuer {
        return Err(TokenRejection::InvalidIssuer(format!(
            "expected '{}', got '{}'",
            expected_issuer, iss
        ))
        .into());
    }

    let aud = match claims.aud {
        None | Some(serde_json::Value::Null) => return Err(AuthError::missing_claim("aud")),
        Some(serde_json::Value::String(aud)) if aud == expected_audience => aud,
        Some(serde_json::Value::String(aud)) => {
            return Err(TokenRejection::InvalidAudience(format!(
                "expected '{}', got '{}'",
                expected_audience, aud
            ))
            .into());
        },
        Some(other) => {
            return Err(TokenRejection::InvalidAudience(format!(
                "expected a single string, got {}",
                other
            ))
            .into());
        },
    };

    let repository = non_empty(claims.repository).ok_or_else(|| AuthError::missing_claim("repository"))?;
    let actor = non_empty(claims.actor).ok_or_else(|| AuthError::missing_claim("actor"))?;
    let exp = claims.exp.ok_or_else(|| AuthError::missing_claim("exp"))?;

    if exp <= now {
        return Err(AuthError::TokenExpired);
    }

    Ok(VerifiedClaims {
        iss,
        aud,
        exp,
        repository,
        actor,
        sub: claims.sub,
        repository_owner: claims.repository_owner,
        repository_id: claims.repository_id,
        git_ref: claims.git_ref,
        sha: claims.sha,
        workflow: claims.workflow,
        event_name: claims.event_name,
        run_id: claims.run_id,
        jti: claims.jti,
        iat: claims.iat,
        nbf: claims.nbf,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
