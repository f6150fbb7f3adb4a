//! GitHub Dependency Graph API envelope handling.
//!
//! `GET /repos/{owner}/{repo}/dependency-graph/sbom` answers with
//! `{"sbom": {...}}`, and CI actions forward that body unchanged. The inner
//! document is what gets validated.

use serde_json::Value;

/// Name of the single top-level key that marks an envelope.
pub const ENVELOPE_KEY: &str = "sbom";

/// Strips a `{"sbom": {...}}` envelope from an already decoded payload.
///
/// Only the top level is inspected. Values that are not objects, and
/// objects whose `sbom` member is not itself an object, come back unchanged
/// as `Err` so that the SPDX checks report the real problem. Keys beside
/// `sbom` are discarded.
///
/// The inner value is moved out, never re-encoded, so a bare document and
/// the same document inside an envelope yield identical values.
///
/// # Errors
///
/// Returns the value unchanged when it is not an envelope.
///
/// # Examples
///
/// ```
/// use pg_atlas_ingest::envelope::unwrap_envelope_value;
/// use serde_json::json;
///
/// assert_eq!(unwrap_envelope_value(json!({"sbom": {"name": "doc"}})), Ok(json!({"name": "doc"})));
/// assert_eq!(unwrap_envelope_value(json!({"name": "doc"})), Err(json!({"name": "doc"})));
/// ```
pub fn unwrap_envelope_value(value: Value) -> Result<Value, Value> {
    match value {
        Value::Object(mut map) if map.get(ENVELOPE_KEY).is_some_and(Value::is_object) => {
            tracing::debug!("stripped dependency-graph envelope");
            Ok(map.remove(ENVELOPE_KEY).unwrap_or(Value::Null))
        },
        other => Err(other),
    }
}

/// Wraps a document in the dependency-graph envelope.
#[must_use]
pub fn wrap_envelope(document: &Value) -> Vec<u8> {
    serde_json::json!({ ENVELOPE_KEY: document }).to_string().into_bytes()
}
