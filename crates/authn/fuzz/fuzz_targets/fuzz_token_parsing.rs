//! Fuzz target for bearer extraction and JWT header parsing.
//!
//! Feeds arbitrary byte strings as `Authorization` header values. Every
//! result must be either `Ok(...)` or `Err(AuthError)`; no input may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use pg_atlas_authn::{
    jwt::{decode_jwt_header, extract_bearer_token},
    validate_algorithm,
    validation::validate_kid,
};

fuzz_target!(|data: &[u8]| {
    // Header values are visible ASCII in practice; UTF-8 is a superset.
    let Ok(header_value) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(token) = extract_bearer_token(Some(header_value)) else {
        return;
    };

    if let Ok(header) = decode_jwt_header(token) {
        let alg_str = format!("{:?}", header.alg);
        let _ = validate_algorithm(&alg_str);

        if let Some(ref kid) = header.kid {
            let _ = validate_kid(kid);
        }
    }
});
