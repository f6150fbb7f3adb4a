//! SPDX 2.x JSON document model and structural validation.
//!
//! Validation runs in two passes. The first walks the raw JSON value and
//! collects one message per violated rule for the required document
//! fields. The second deserializes the typed [`SpdxDocument`]; it only runs
//! once the first pass is clean, so its error (if any) concerns optional
//! fields carrying the wrong JSON type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{envelope::unwrap_envelope_value, error::SpdxValidationError};

/// SPDX versions accepted in JSON form.
pub const SUPPORTED_SPDX_VERSIONS: &[&str] = &["SPDX-2.2", "SPDX-2.3"];

/// Prefix every SPDX element identifier carries.
pub const SPDX_REF_PREFIX: &str = "SPDXRef-";

/// Typed view of an SPDX 2.x JSON document.
///
/// Only the fields later graph processing needs are modelled; unknown
/// fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpdxDocument {
    /// Specification version, e.g. `SPDX-2.3`.
    pub spdx_version: String,
    /// Document self-identifier, conventionally `SPDXRef-DOCUMENT`.
    #[serde(rename = "SPDXID")]
    pub spdx_id: String,
    /// Unique absolute URI of the document.
    pub document_namespace: String,
    /// Document name.
    pub name: String,
    /// Data license, normally `CC0-1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_license: Option<String>,
    /// Creation metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_info: Option<CreationInfo>,
    /// Declared packages, in document order.
    #[serde(default)]
    pub packages: Vec<SpdxPackage>,
    /// Relationships between elements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<SpdxRelationship>,
}

/// Document creation metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationInfo {
    /// RFC 3339 creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Tools, people and organizations that produced the document.
    #[serde(default)]
    pub creators: Vec<String>,
}

/// A package entry. Every field is optional so that minimal entries still
/// count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpdxPackage {
    /// Package element identifier.
    #[serde(rename = "SPDXID", default, skip_serializing_if = "Option::is_none")]
    pub spdx_id: Option<String>,
    /// Package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Package version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_info: Option<String>,
    /// Download location, often `NOASSERTION`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_location: Option<String>,
    /// Concluded license expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_concluded: Option<String>,
    /// Declared license expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_declared: Option<String>,
    /// Copyright text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright_text: Option<String>,
    /// Package supplier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    /// External references (package URLs, CPEs, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_refs: Vec<ExternalRef>,
    /// File or package checksums.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checksums: Vec<Checksum>,
}

impl SpdxPackage {
    /// Returns the first `purl` external reference, if any.
    #[must_use]
    pub fn purl(&self) -> Option<&str> {
        self.external_refs
            .iter()
            .find(|r| r.reference_type.eq_ignore_ascii_case("purl"))
            .map(|r| r.reference_locator.as_str())
    }
}

/// External reference attached to a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRef {
    /// Category, e.g. `PACKAGE-MANAGER` or `PACKAGE_MANAGER`.
    #[serde(default)]
    pub reference_category: String,
    /// Type, e.g. `purl`.
    pub reference_type: String,
    /// Locator, e.g. `pkg:cargo/serde@1.0.0`.
    pub reference_locator: String,
}

/// Checksum attached to a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checksum {
    /// Hash algorithm, e.g. `SHA256`.
    pub algorithm: String,
    /// Hex digest.
    pub checksum_value: String,
}

/// Relationship between two SPDX elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpdxRelationship {
    /// Source element.
    pub spdx_element_id: String,
    /// Relationship kind, e.g. `DEPENDS_ON`.
    pub relationship_type: String,
    /// Target element.
    pub related_spdx_element: String,
}

/// A validated submission ready for downstream processing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSubmission {
    document: SpdxDocument,
    raw: Value,
}

impl ParsedSubmission {
    /// Number of declared package entries.
    #[must_use]
    pub fn package_count(&self) -> usize {
        self.document.packages.len()
    }

    /// Typed document.
    #[must_use]
    pub fn document(&self) -> &SpdxDocument {
        &self.document
    }

    /// Document as received (after envelope removal), including fields the
    /// typed model does not know.
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Consumes the submission, returning the untouched JSON document.
    #[must_use]
    pub fn into_raw(self) -> Value {
        self.raw
    }
}

/// Normalizes transport wrapping and parses the payload as SPDX JSON.
///
/// A bare document and the same document inside a `{"sbom": ...}`
/// envelope produce equal results.
///
/// # Errors
///
/// Returns [`SpdxValidationError`] when the payload is not JSON or violates
/// the SPDX structure.
pub fn normalize_and_parse(raw: &[u8]) -> Result<ParsedSubmission, SpdxValidationError> {
    let value = decode(raw)?;
    parse_spdx_value(unwrap_envelope_value(value).unwrap_or_else(|bare| bare))
}

/// Parses bytes as an SPDX 2.x JSON document without envelope handling.
///
/// # Errors
///
/// Returns [`SpdxValidationError`] listing every violated rule.
pub fn parse_spdx_json(bytes: &[u8]) -> Result<ParsedSubmission, SpdxValidationError> {
    parse_spdx_value(decode(bytes)?)
}

fn decode(bytes: &[u8]) -> Result<Value, SpdxValidationError> {
    serde_json::from_slice(bytes)
        .map_err(|e| SpdxValidationError::single(format!("document is not valid JSON: {e}")))
}

/// Validates an already decoded JSON value as an SPDX 2.x document.
///
/// # Errors
///
/// Returns [`SpdxValidationError`] listing every violated rule.
pub fn parse_spdx_value(raw: Value) -> Result<ParsedSubmission, SpdxValidationError> {
    let Some(object) = raw.as_object() else {
        return Err(SpdxValidationError::single(format!(
            "document must be a JSON object, found {}",
            json_type_name(&raw)
        )));
    };

    let messages = check_document(object);
    if !messages.is_empty() {
        return Err(SpdxValidationError::new(messages));
    }

    let document = SpdxDocument::deserialize(&raw)
        .map_err(|e| SpdxValidationError::single(format!("document: {e}")))?;

    Ok(ParsedSubmission { document, raw })
}

fn check_document(object: &Map<String, Value>) -> Vec<String> {
    let mut messages = Vec::new();

    if let Some(version) = required_string(object, "spdxVersion", &mut messages)
        && !SUPPORTED_SPDX_VERSIONS.contains(&version)
    {
        messages.push(format!(
            "spdxVersion: unsupported version '{version}', expected one of {}",
            SUPPORTED_SPDX_VERSIONS.join(", ")
        ));
    }

    if let Some(id) = required_string(object, "SPDXID", &mut messages)
        && !id.starts_with(SPDX_REF_PREFIX)
    {
        messages.push(format!("SPDXID: '{id}' must start with '{SPDX_REF_PREFIX}'"));
    }

    if let Some(namespace) = required_string(object, "documentNamespace", &mut messages)
        && let Err(e) = url::Url::parse(namespace)
    {
        messages.push(format!("documentNamespace: '{namespace}' is not an absolute URI ({e})"));
    }

    if let Some(name) = required_string(object, "name", &mut messages)
        && name.trim().is_empty()
    {
        messages.push("name: must not be empty".to_owned());
    }

    match object.get("packages") {
        None => {},
        Some(Value::Array(entries)) => {
            for (index, entry) in entries.iter().enumerate() {
                if !entry.is_object() {
                    messages.push(format!(
                        "packages[{index}]: must be an object, found {}",
                        json_type_name(entry)
                    ));
                }
            }
        },
        Some(other) => {
            messages.push(format!("packages: must be an array, found {}", json_type_name(other)));
        },
    }

    messages
}

fn required_string<'a>(
    object: &'a Map<String, Value>,
    field: &str,
    messages: &mut Vec<String>,
) -> Option<&'a str> {
    match object.get(field) {
        None => {
            messages.push(format!("{field}: field required"));
            None
        },
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            messages.push(format!("{field}: must be a string, found {}", json_type_name(other)));
            None
        },
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
