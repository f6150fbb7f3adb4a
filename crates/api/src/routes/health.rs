use axum::Json;
use serde::Serialize;

/// Liveness response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Version of the running build.
    pub version: &'static str,
}

/// `GET /health`
#[tracing::instrument]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok", version: env!("CARGO_PKG_VERSION") })
}
