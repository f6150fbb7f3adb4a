//! Shared test utilities for authentication testing.
//!
//! This module provides two fixed RSA key pairs with their published JWKs,
//! helpers for signing GitHub-shaped OIDC tokens, and crafting raw JWT
//! strings (for attack testing). It is feature-gated behind `testutil` to
//! prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! pg-atlas-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use pg_atlas_authn::testutil::{PRIMARY_KID, create_signed_jwt, github_claims, test_jwks};
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header,
    jwk::{Jwk, JwkSet},
};
use serde_json::json;

use crate::config::GITHUB_OIDC_ISSUER;

/// Key ID of the primary test key.
pub const PRIMARY_KID: &str = "primary-test-key";

/// Key ID of the secondary test key.
pub const SECONDARY_KID: &str = "secondary-test-key";

/// Repository claim carried by [`github_claims`].
pub const TEST_REPOSITORY: &str = "acme/widget";

/// Actor claim carried by [`github_claims`].
pub const TEST_ACTOR: &str = "bot";

/// PKCS#1 PEM private key matching [`PRIMARY_KID`].
pub const PRIMARY_RSA_PEM: &str = include_str!("../tests/fixtures/primary_rsa.pem");

/// PKCS#1 PEM private key matching [`SECONDARY_KID`].
pub const SECONDARY_RSA_PEM: &str = include_str!("../tests/fixtures/secondary_rsa.pem");

const PRIMARY_JWK_JSON: &str = include_str!("../tests/fixtures/primary_jwk.json");
const SECONDARY_JWK_JSON: &str = include_str!("../tests/fixtures/secondary_jwk.json");

/// Returns the published JWK for one of the two test keys.
///
/// # Panics
///
/// Panics if `kid` is neither [`PRIMARY_KID`] nor [`SECONDARY_KID`].
pub fn test_jwk(kid: &str) -> Jwk {
    let json = match kid {
        PRIMARY_KID => PRIMARY_JWK_JSON,
        SECONDARY_KID => SECONDARY_JWK_JSON,
        other => panic!("no test JWK for kid '{other}'"),
    };
    serde_json::from_str(json).expect("fixture JWK")
}

/// Returns a key set publishing both test keys.
pub fn test_jwks() -> JwkSet {
    JwkSet { keys: vec![test_jwk(PRIMARY_KID), test_jwk(SECONDARY_KID)] }
}

/// Returns the RS256 verification key of the primary test key.
pub fn primary_decoding_key() -> DecodingKey {
    DecodingKey::from_jwk(&test_jwk(PRIMARY_KID)).expect("primary decoding key")
}

/// Returns the RS256 verification key of the secondary test key.
pub fn secondary_decoding_key() -> DecodingKey {
    DecodingKey::from_jwk(&test_jwk(SECONDARY_KID)).expect("secondary decoding key")
}

/// Returns a GitHub Actions shaped claim set for `audience`.
///
/// The token is valid for five minutes from now and names
/// [`TEST_REPOSITORY`] / [`TEST_ACTOR`].
pub fn github_claims(audience: &str) -> serde_json::Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": GITHUB_OIDC_ISSUER,
        "aud": audience,
        "sub": format!("repo:{TEST_REPOSITORY}:ref:refs/heads/main"),
        "exp": now + 300,
        "iat": now,
        "nbf": now - 5,
        "jti": "9b1a2f4e-0c3d-4e5f-8a9b-1c2d3e4f5a6b",
        "repository": TEST_REPOSITORY,
        "repository_owner": "acme",
        "repository_id": "123456789",
        "actor": TEST_ACTOR,
        "ref": "refs/heads/main",
        "sha": "3f786850e387550fdab836ed7e6dc881de23001b",
        "workflow": "sbom",
        "event_name": "push",
        "run_id": "4242424242",
    })
}

/// Signs `claims` with RS256 using the PEM key, setting `kid` in the header
/// when given.
///
/// # Panics
///
/// Panics if the PEM is invalid or JWT encoding fails.
pub fn create_signed_jwt_with_key(pem: &str, kid: Option<&str>, claims: &serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_owned);

    let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("test RSA key");
    jsonwebtoken::encode(&header, claims, &encoding_key).expect("Failed to encode test JWT")
}

/// Signs `claims` with RS256 and the header `kid` set to `kid`.
///
/// The secondary key signs when `kid` is [`SECONDARY_KID`]; every other
/// `kid` (including ones absent from [`test_jwks`]) is signed with the
/// primary key.
///
/// # Panics
///
/// Panics if JWT encoding fails (should not happen with valid inputs).
pub fn create_signed_jwt(kid: &str, claims: &serde_json::Value) -> String {
    let pem = if kid == SECONDARY_KID { SECONDARY_RSA_PEM } else { PRIMARY_RSA_PEM };
    create_signed_jwt_with_key(pem, Some(kid), claims)
}

/// Creates a raw JWT string from arbitrary header and payload JSON.
///
/// The resulting JWT has the structure `{header_b64}.{payload_b64}.`
/// with an empty signature. This is useful for testing rejection of
/// malformed or attack JWTs (e.g., `alg: "none"`, algorithm confusion).
///
/// # Panics
///
/// Panics if JSON serialization fails.
pub fn craft_raw_jwt(header_json: &serde_json::Value, payload_json: &serde_json::Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}.")
}

/// Asserts that a [`Result<T, AuthError>`] is an `Err` matching the given [`AuthError`] variant.
///
/// Works with any `AuthError` variant. On failure, prints the expected variant
/// and the actual result for debugging.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use pg_atlas_authn::assert_auth_error;
/// use pg_atlas_authn::error::AuthError;
///
/// let result: Result<(), AuthError> = Err(AuthError::TokenExpired);
/// assert_auth_error!(result, TokenExpired);
/// ```
///
/// [`AuthError`]: crate::error::AuthError
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "{}: expected AuthError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}
