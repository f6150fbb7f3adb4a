//! Mapping of admission failures to HTTP responses.

use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use pg_atlas_authn::{AuthError, AuthErrorKind};
use pg_atlas_ingest::{SinkError, SpdxValidationError};
use serde_json::json;
use thiserror::Error;

/// Body of a 401 response.
pub const UNAUTHENTICATED_MESSAGE: &str =
    "Missing or malformed Authorization header. Expected: Bearer <oidc-token>";
/// Body of a 403 response when no signing key could be resolved.
pub const KEY_RESOLUTION_MESSAGE: &str = "Unable to retrieve or select JWKS signing key.";
/// Body of a 403 response for an expired token.
pub const TOKEN_EXPIRED_MESSAGE: &str = "OIDC token has expired.";
/// Body of a 403 response for any other token failure.
pub const TOKEN_INVALID_MESSAGE: &str = "OIDC token validation failed.";
/// Body of a 500 response.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Errors returned by request handlers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Authentication failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The request body could not be buffered, typically because it
    /// exceeds the configured limit.
    #[error(transparent)]
    Body(#[from] BytesRejection),

    /// The SBOM is not a valid SPDX document.
    #[error(transparent)]
    InvalidSbom(#[from] SpdxValidationError),

    /// The submission could not be handed off.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    ///
    /// - Unauthenticated: 401 Unauthorized
    /// - Key resolution, invalid or expired token: 403 Forbidden
    /// - Unreadable body: the rejection's own status, 413 when over the limit
    /// - Invalid SBOM: 422 Unprocessable Entity
    /// - Sink failure: 500 Internal Server Error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(e) => match e.kind() {
                AuthErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
                AuthErrorKind::KeyResolution
                | AuthErrorKind::TokenInvalid
                | AuthErrorKind::TokenExpired => StatusCode::FORBIDDEN,
            },
            Self::Body(e) => e.status(),
            Self::InvalidSbom(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Sink(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Authentication bodies name the category only; the precise reason
        // has already been logged by the verifier.
        let status = self.status_code();
        match self {
            Self::Auth(e) => {
                let (message, challenge) = match e.kind() {
                    AuthErrorKind::Unauthenticated => (UNAUTHENTICATED_MESSAGE, true),
                    AuthErrorKind::KeyResolution => (KEY_RESOLUTION_MESSAGE, false),
                    AuthErrorKind::TokenExpired => (TOKEN_EXPIRED_MESSAGE, false),
                    AuthErrorKind::TokenInvalid => (TOKEN_INVALID_MESSAGE, false),
                };
                let mut response = (status, Json(json!({ "error": message }))).into_response();
                if challenge {
                    response
                        .headers_mut()
                        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                }
                response
            },
            Self::Body(e) => (status, Json(json!({ "error": e.body_text() }))).into_response(),
            Self::InvalidSbom(e) => {
                (status, Json(json!({ "error": e.detail, "messages": e.messages }))).into_response()
            },
            Self::Sink(e) => {
                tracing::error!(error = %e, "submission sink failed");
                (status, Json(json!({ "error": INTERNAL_MESSAGE }))).into_response()
            },
        }
    }
}
