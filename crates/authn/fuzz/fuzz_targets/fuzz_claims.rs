//! Fuzz target for claim decoding and validation.
//!
//! Interprets arbitrary bytes as a JWT payload and runs claim validation
//! against fixed and self-matching expectations.

#![no_main]

use libfuzzer_sys::fuzz_target;

use pg_atlas_authn::{GITHUB_OIDC_ISSUER, jwt::{JwtClaims, validate_claims}};

fuzz_target!(|data: &[u8]| {
    let Ok(claims) = serde_json::from_slice::<JwtClaims>(data) else {
        return;
    };

    let _ = validate_claims(claims.clone(), GITHUB_OIDC_ISSUER, "https://api.pg-atlas.example", 0);
    let _ = validate_claims(claims.clone(), GITHUB_OIDC_ISSUER, "https://api.pg-atlas.example", i64::MAX);

    // Expectations taken from the payload itself exercise the success path.
    let issuer = claims.iss.clone().unwrap_or_default();
    let audience = claims.aud.as_ref().and_then(|a| a.as_str()).unwrap_or_default().to_owned();
    let _ = validate_claims(claims, &issuer, &audience, i64::MIN);
});
