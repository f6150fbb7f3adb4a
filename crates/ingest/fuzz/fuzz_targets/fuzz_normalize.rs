//! Fuzz target for SBOM normalization.
//!
//! Arbitrary bytes go through envelope unwrapping and SPDX validation. The
//! result must be a parsed submission or a validation error, and a document
//! that parses bare must parse identically inside an envelope.

#![no_main]

use libfuzzer_sys::fuzz_target;

use pg_atlas_ingest::{envelope::wrap_envelope, normalize_and_parse};

fuzz_target!(|data: &[u8]| {
    let Ok(parsed) = normalize_and_parse(data) else {
        return;
    };

    assert_eq!(parsed.package_count(), parsed.document().packages.len());

    let wrapped = wrap_envelope(parsed.raw());
    let again = normalize_and_parse(&wrapped).expect("enveloped document must parse");
    assert_eq!(again, parsed);
});
