//! # PG Atlas API
//!
//! HTTP boundary of the ingestion pipeline.
//!
//! | Route | Outcome |
//! |-------|---------|
//! | `GET /health` | 200 `{status, version}` |
//! | `POST /ingest/sbom` | 202 receipt, 401 no credential, 403 rejected token, 422 invalid SPDX |

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

pub use config::{DEFAULT_MAX_BODY_BYTES, Settings, SettingsError};
pub use error::ApiError;
pub use state::AppState;

/// Builds the application router.
///
/// `max_body_bytes` bounds the size of an uploaded SBOM. The ingest handler
/// buffers the body only after authentication, so the limit (413) is never
/// reported to an unauthenticated caller.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/ingest/sbom", post(routes::ingest_sbom))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}
