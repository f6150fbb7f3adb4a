use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{StatusCode, header::AUTHORIZATION},
};
use pg_atlas_ingest::{SubmissionReceipt, normalize_and_parse};

use crate::{error::ApiError, state::AppState};

/// `POST /ingest/sbom`
///
/// Authenticates the caller, then validates the body as SPDX JSON (bare or
/// inside a `{"sbom": ...}` envelope) and hands it to the sink.
///
/// The body is buffered only after the token is accepted, so the router's
/// body limit (413) applies to authenticated callers alone and everyone else
/// gets 401 or 403 without the upload being read.
///
/// # Errors
///
/// Returns [`ApiError`] for authentication, body, validation and sink
/// failures.
#[tracing::instrument(skip_all)]
pub async fn ingest_sbom(
    State(state): State<AppState>,
    request: Request,
) -> Result<(StatusCode, Json<SubmissionReceipt>), ApiError> {
    // A header that is not visible ASCII cannot hold a bearer token.
    let authorization =
        request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    let claims = state.verifier.verify(authorization).await?;

    let body = Bytes::from_request(request, &state).await?;
    tracing::debug!(repository = %claims.repository, body_bytes = body.len(), "received SBOM");

    let submission = normalize_and_parse(&body).inspect_err(|e| {
        tracing::info!(
            repository = %claims.repository,
            problems = e.messages.len(),
            "rejected invalid SBOM"
        );
    })?;

    let receipt = state.sink.accept(&claims, submission).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}
