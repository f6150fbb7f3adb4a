#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Tests for `GET /health`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use pg_atlas_api::{AppState, DEFAULT_MAX_BODY_BYTES, router};
use pg_atlas_authn::{JwksCache, JwksCacheConfig, MemoryJwksFetcher, OidcVerifier, VerifierConfig};
use pg_atlas_ingest::LoggingSink;
use serde_json::{Value, json};
use tower::ServiceExt;

#[tokio::test]
async fn test_health_reports_version_without_touching_jwks() {
    let fetcher = MemoryJwksFetcher::new();
    let cache = Arc::new(JwksCache::new(Arc::new(fetcher.clone()), JwksCacheConfig::default()));
    let config = VerifierConfig::builder().audience("https://api.pg-atlas.test").build().unwrap();
    let state = AppState::new(OidcVerifier::new(config, cache), Arc::new(LoggingSink::new()));
    let app = router(state, DEFAULT_MAX_BODY_BYTES);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}));
    assert_eq!(fetcher.fetch_count(), 0);
}
