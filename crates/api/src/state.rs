//! Shared handler state.

use std::sync::Arc;

use pg_atlas_authn::OidcVerifier;
use pg_atlas_ingest::SubmissionSink;

/// State cloned into every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Verifies the bearer token of write requests.
    pub verifier: Arc<OidcVerifier>,
    /// Receives accepted submissions.
    pub sink: Arc<dyn SubmissionSink>,
}

impl AppState {
    /// Creates handler state from its components.
    #[must_use]
    pub fn new(verifier: OidcVerifier, sink: Arc<dyn SubmissionSink>) -> Self {
        Self { verifier: Arc::new(verifier), sink }
    }
}
