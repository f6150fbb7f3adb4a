//! # PG Atlas Ingestion
//!
//! Admission of SBOM submissions after authentication.
//!
//! - [`envelope`]: strips the GitHub dependency-graph `{"sbom": ...}` wrapper
//! - [`spdx`]: SPDX 2.x JSON model and structural validation
//! - [`sink`]: the hand-off point for accepted submissions
//!
//! ```
//! use pg_atlas_ingest::normalize_and_parse;
//!
//! let body = br#"{"sbom": {"spdxVersion": "SPDX-2.3", "SPDXID": "SPDXRef-DOCUMENT",
//!     "documentNamespace": "https://example/ns", "name": "doc", "packages": [{}, {}]}}"#;
//! let parsed = normalize_and_parse(body).unwrap();
//! assert_eq!(parsed.package_count(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;
pub mod error;
pub mod sink;
pub mod spdx;

pub use envelope::{unwrap_envelope_value, wrap_envelope};
pub use error::{INVALID_SPDX_DETAIL, SinkError, SpdxValidationError};
pub use sink::{LoggingSink, QUEUED_MESSAGE, SubmissionReceipt, SubmissionSink};
pub use spdx::{
    CreationInfo, ExternalRef, ParsedSubmission, SUPPORTED_SPDX_VERSIONS, SpdxDocument,
    SpdxPackage, SpdxRelationship, normalize_and_parse, parse_spdx_json, parse_spdx_value,
};
