//! Downstream hand-off for accepted submissions.

use async_trait::async_trait;
use pg_atlas_authn::VerifiedClaims;
use serde::{Deserialize, Serialize};

use crate::{error::SinkError, spdx::ParsedSubmission};

/// Message returned for every queued submission.
pub const QUEUED_MESSAGE: &str = "queued";

/// Acknowledgement returned to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Always [`QUEUED_MESSAGE`] for accepted submissions.
    pub message: String,
    /// Repository the submission is attributed to.
    pub repository: String,
    /// Number of declared packages.
    pub package_count: usize,
}

impl SubmissionReceipt {
    /// Receipt for a queued submission.
    #[must_use]
    pub fn queued(repository: impl Into<String>, package_count: usize) -> Self {
        Self { message: QUEUED_MESSAGE.to_owned(), repository: repository.into(), package_count }
    }
}

/// Receives authenticated, validated submissions.
///
/// Implementations may process inline or enqueue for later work; callers
/// only see the receipt.
#[async_trait]
pub trait SubmissionSink: Send + Sync + std::fmt::Debug {
    /// Accepts a submission attributed to `claims`.
    async fn accept(
        &self,
        claims: &VerifiedClaims,
        submission: ParsedSubmission,
    ) -> Result<SubmissionReceipt, SinkError>;
}

/// Sink that records the submission in the log and drops it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl LoggingSink {
    /// Creates the sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SubmissionSink for LoggingSink {
    async fn accept(
        &self,
        claims: &VerifiedClaims,
        submission: ParsedSubmission,
    ) -> Result<SubmissionReceipt, SinkError> {
        let package_count = submission.package_count();
        tracing::info!(
            repository = %claims.repository,
            actor = %claims.actor,
            packages = package_count,
            document = %submission.document().name,
            "SBOM submission received"
        );
        Ok(SubmissionReceipt::queued(claims.repository.clone(), package_count))
    }
}
