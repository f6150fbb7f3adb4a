#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! End-to-end tests for `POST /ingest/sbom`, driven in-process through the
//! router with an in-memory JWKS source.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{
        HeaderMap, Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
    },
};
use http_body_util::BodyExt;
use pg_atlas_api::{
    AppState, DEFAULT_MAX_BODY_BYTES,
    error::{
        INTERNAL_MESSAGE, KEY_RESOLUTION_MESSAGE, TOKEN_EXPIRED_MESSAGE, TOKEN_INVALID_MESSAGE,
        UNAUTHENTICATED_MESSAGE,
    },
    router,
};
use pg_atlas_authn::{
    GITHUB_JWKS_URL, JwksCache, JwksCacheConfig, KeyResolutionError, MemoryJwksFetcher,
    OidcVerifier, VerifiedClaims, VerifierConfig,
    testutil::{PRIMARY_KID, create_signed_jwt, github_claims, test_jwks},
};
use pg_atlas_ingest::{
    INVALID_SPDX_DETAIL, LoggingSink, ParsedSubmission, SinkError, SubmissionReceipt,
    SubmissionSink,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const AUDIENCE: &str = "https://api.pg-atlas.test";

const VALID_FIXTURE: &str = include_str!("fixtures/valid.spdx.json");
const GITHUB_FIXTURE: &str = include_str!("fixtures/github_dep_graph.spdx.json");
const INVALID_FIXTURE: &str = include_str!("fixtures/invalid.spdx.json");

struct Harness {
    app: Router,
    fetcher: MemoryJwksFetcher,
}

fn harness_with(sink: Arc<dyn SubmissionSink>, max_body_bytes: usize) -> Harness {
    let fetcher = MemoryJwksFetcher::with_set(GITHUB_JWKS_URL, test_jwks());
    let cache = Arc::new(JwksCache::new(Arc::new(fetcher.clone()), JwksCacheConfig::default()));
    let config = VerifierConfig::builder().audience(AUDIENCE).build().unwrap();
    let state = AppState::new(OidcVerifier::new(config, cache), sink);
    Harness { app: router(state, max_body_bytes), fetcher }
}

fn harness() -> Harness {
    harness_with(Arc::new(LoggingSink::new()), DEFAULT_MAX_BODY_BYTES)
}

fn valid_token() -> String {
    format!("Bearer {}", create_signed_jwt(PRIMARY_KID, &github_claims(AUDIENCE)))
}

fn minimal_document() -> Value {
    json!({
        "spdxVersion": "SPDX-2.3",
        "SPDXID": "SPDXRef-DOCUMENT",
        "documentNamespace": "https://example/ns",
        "name": "doc",
        "packages": [{}, {}],
    })
}

async fn send(app: &Router, authorization: Option<&str>, body: impl Into<Body>) -> axum::response::Response {
    let mut request =
        Request::builder().method("POST").uri("/ingest/sbom").header(CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        request = request.header(AUTHORIZATION, value);
    }
    app.clone().oneshot(request.body(body.into()).unwrap()).await.unwrap()
}

async fn post(app: &Router, authorization: Option<&str>, body: impl Into<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = send(app, authorization, body).await;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).expect("JSON response body");
    (status, headers, json)
}

// =============================================================================
// Accepted submissions
// =============================================================================

#[tokio::test]
async fn test_valid_sbom_is_queued() {
    let h = harness();
    let (status, _, body) = post(&h.app, Some(&valid_token()), minimal_document().to_string()).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({"message": "queued", "repository": "acme/widget", "package_count": 2}));
}

#[tokio::test]
async fn test_enveloped_sbom_gets_identical_response() {
    let h = harness();
    let token = valid_token();

    let bare = post(&h.app, Some(&token), minimal_document().to_string()).await;
    let wrapped =
        post(&h.app, Some(&token), json!({ "sbom": minimal_document() }).to_string()).await;

    assert_eq!(bare.0, wrapped.0);
    assert_eq!(bare.2, wrapped.2);
}

#[tokio::test]
async fn test_fixture_documents_are_queued() {
    let h = harness();
    let token = valid_token();

    for fixture in [VALID_FIXTURE, GITHUB_FIXTURE] {
        let (status, _, body) = post(&h.app, Some(&token), fixture).await;
        assert_eq!(status, StatusCode::ACCEPTED, "{body}");
        assert_eq!(body["package_count"], 2);
        assert_eq!(body["repository"], "acme/widget");
    }
}

#[tokio::test]
async fn test_empty_package_list_is_queued_with_zero_count() {
    let h = harness();
    let mut document = minimal_document();
    document["packages"] = json!([]);

    let (status, _, body) = post(&h.app, Some(&valid_token()), document.to_string()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["package_count"], 0);
}

#[tokio::test]
async fn test_key_set_is_fetched_once_across_requests() {
    let h = harness();
    let token = valid_token();

    for _ in 0..3 {
        let (status, ..) = post(&h.app, Some(&token), minimal_document().to_string()).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }
    assert_eq!(h.fetcher.fetch_count(), 1);
}

// =============================================================================
// Authentication failures
// =============================================================================

#[tokio::test]
async fn test_missing_authorization_is_401() {
    let h = harness();
    let (status, headers, body) = post(&h.app, None, minimal_document().to_string()).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers.get(WWW_AUTHENTICATE).unwrap(), "Bearer");
    assert_eq!(body, json!({"error": UNAUTHENTICATED_MESSAGE}));
    assert_eq!(h.fetcher.fetch_count(), 0, "no key fetch without a credential");
}

#[tokio::test]
async fn test_non_bearer_schemes_are_401() {
    let h = harness();
    for header in ["Basic dXNlcjpwYXNz", "bearer abc", "Bearer", "Token abc"] {
        let (status, ..) = post(&h.app, Some(header), minimal_document().to_string()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{header}");
    }
}

#[tokio::test]
async fn test_authentication_precedes_body_validation() {
    let h = harness();
    let (status, ..) = post(&h.app, None, "{}").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    h.fetcher.set_failure(Some(|| KeyResolutionError::unavailable(GITHUB_JWKS_URL, "down")));
    let (status, ..) = post(&h.app, Some("Bearer bad.token.here"), "not json").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_key_resolution_failure_is_403() {
    let h = harness();
    h.fetcher.set_failure(Some(|| KeyResolutionError::unavailable(GITHUB_JWKS_URL, "down")));

    let (status, headers, body) =
        post(&h.app, Some("Bearer bad.token.here"), minimal_document().to_string()).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(headers.get(WWW_AUTHENTICATE).is_none());
    assert_eq!(body, json!({"error": KEY_RESOLUTION_MESSAGE}));
}

#[tokio::test]
async fn test_garbage_token_is_403_invalid() {
    let h = harness();
    let (status, _, body) =
        post(&h.app, Some("Bearer bad.token.here"), minimal_document().to_string()).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": TOKEN_INVALID_MESSAGE}));
}

#[tokio::test]
async fn test_expired_token_is_403_expired() {
    let h = harness();
    let mut claims = github_claims(AUDIENCE);
    claims["exp"] = json!(unix_now() - 60);
    let token = format!("Bearer {}", create_signed_jwt(PRIMARY_KID, &claims));

    let (status, _, body) = post(&h.app, Some(&token), minimal_document().to_string()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": TOKEN_EXPIRED_MESSAGE}));
}

#[tokio::test]
async fn test_wrong_audience_is_403_invalid() {
    let h = harness();
    let token = format!(
        "Bearer {}",
        create_signed_jwt(PRIMARY_KID, &github_claims("https://api.pg-atlas.test/"))
    );

    let (status, _, body) = post(&h.app, Some(&token), minimal_document().to_string()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": TOKEN_INVALID_MESSAGE}));
}

#[tokio::test]
async fn test_unknown_kid_is_403_key_resolution() {
    let h = harness();
    let token = format!("Bearer {}", create_signed_jwt("rotated-away", &github_claims(AUDIENCE)));

    let (status, _, body) = post(&h.app, Some(&token), minimal_document().to_string()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": KEY_RESOLUTION_MESSAGE}));
}

// =============================================================================
// Validation failures
// =============================================================================

#[tokio::test]
async fn test_empty_object_is_422_with_messages() {
    let h = harness();
    let (status, _, body) = post(&h.app, Some(&valid_token()), "{}").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], INVALID_SPDX_DETAIL);
    let messages = body["messages"].as_array().unwrap();
    assert!(!messages.is_empty());
}

#[tokio::test]
async fn test_invalid_fixture_lists_each_problem() {
    let h = harness();
    let (status, _, body) = post(&h.app, Some(&valid_token()), INVALID_FIXTURE).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let messages: Vec<&str> =
        body["messages"].as_array().unwrap().iter().map(|m| m.as_str().unwrap()).collect();
    assert_eq!(messages.len(), 2, "{messages:?}");
    assert!(messages.iter().any(|m| m.starts_with("SPDXID")));
    assert!(messages.iter().any(|m| m.starts_with("documentNamespace")));
}

#[tokio::test]
async fn test_non_json_body_is_422() {
    let h = harness();
    for body in ["not json", "[1, 2, 3]", r#"{"sbom": "not-an-object"}"#] {
        let (status, _, response) = post(&h.app, Some(&valid_token()), body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        assert!(!response["messages"].as_array().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_body_over_limit_is_rejected() {
    let h = harness_with(Arc::new(LoggingSink::new()), 64);
    let (status, _, body) = post(&h.app, Some(&valid_token()), minimal_document().to_string()).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_oversized_body_without_credential_is_401() {
    let h = harness_with(Arc::new(LoggingSink::new()), 64);
    let (status, headers, body) = post(&h.app, None, minimal_document().to_string()).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers.get(WWW_AUTHENTICATE).unwrap(), "Bearer");
    assert_eq!(body, json!({"error": UNAUTHENTICATED_MESSAGE}));
}

#[tokio::test]
async fn test_oversized_body_with_rejected_token_is_403() {
    let h = harness_with(Arc::new(LoggingSink::new()), 64);
    let (status, _, body) =
        post(&h.app, Some("Bearer bad.token.here"), minimal_document().to_string()).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": TOKEN_INVALID_MESSAGE}));
}

// =============================================================================
// Sink failures
// =============================================================================

#[derive(Debug)]
struct FailingSink;

#[async_trait]
impl SubmissionSink for FailingSink {
    async fn accept(
        &self,
        _claims: &VerifiedClaims,
        _submission: ParsedSubmission,
    ) -> Result<SubmissionReceipt, SinkError> {
        Err(SinkError::unavailable("queue at capacity"))
    }
}

#[tokio::test]
async fn test_sink_failure_is_500_without_detail() {
    let h = harness_with(Arc::new(FailingSink), DEFAULT_MAX_BODY_BYTES);
    let (status, _, body) = post(&h.app, Some(&valid_token()), minimal_document().to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": INTERNAL_MESSAGE}));
}

fn unix_now() -> i64 {
    let elapsed = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap();
    i64::try_from(elapsed.as_secs()).unwrap()
}
