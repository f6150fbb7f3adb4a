//! Ingestion error types.

use thiserror::Error;

/// Summary used for every SPDX validation failure.
pub const INVALID_SPDX_DETAIL: &str = "Invalid SPDX document.";

/// An SBOM payload that is not a structurally valid SPDX document.
///
/// Carries a short summary plus one message per violated rule, so callers
/// can fix every problem in one round trip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{detail} ({} problem(s))", messages.len())]
pub struct SpdxValidationError {
    /// Human-readable summary.
    pub detail: String,
    /// One entry per violated field or rule.
    pub messages: Vec<String>,
}

impl SpdxValidationError {
    /// Creates an error with the standard summary.
    #[must_use]
    pub fn new(messages: Vec<String>) -> Self {
        Self { detail: INVALID_SPDX_DETAIL.to_owned(), messages }
    }

    /// Creates an error with a single message.
    #[must_use]
    pub fn single(message: impl Into<String>) -> Self {
        Self::new(vec![message.into()])
    }
}

/// Failure to hand a submission to downstream processing.
///
/// # Non-exhaustive
///
/// New variants may be added in minor releases. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SinkError {
    /// The downstream pipeline cannot take submissions right now.
    #[error("submission sink unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// Unexpected failure inside the sink.
    #[error("submission sink failed: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl SinkError {
    /// Creates an [`Unavailable`](Self::Unavailable) error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    /// Creates an [`Internal`](Self::Internal) error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_counts_messages() {
        let err = SpdxValidationError::new(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Invalid SPDX document. (2 problem(s))");
        assert_eq!(err.detail, INVALID_SPDX_DETAIL);
    }

    #[test]
    fn test_sink_error_display() {
        assert_eq!(
            SinkError::unavailable("queue full").to_string(),
            "submission sink unavailable: queue full"
        );
    }
}
