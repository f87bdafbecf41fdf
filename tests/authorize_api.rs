// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end tests driving the HTTP router in-process.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use request_authorizer::api::router;
use request_authorizer::authorizer::Authorizer;
use request_authorizer::cache::{CacheError, MemoryTokenStore, TokenCache, TokenStore};
use request_authorizer::state::AppState;
use request_authorizer::token::{TokenGenerator, TokenValue};

const ARN: &str = "arn:aws:execute-api:us-east-1:123456789012:abcdef123/prod/GET/orders";

struct DownStore;

#[async_trait]
impl TokenStore for DownStore {
    async fn put(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn backend(&self) -> &'static str {
        "down"
    }
}

fn app_over(store: Arc<dyn TokenStore>) -> Router {
    let cache = TokenCache::new(store, Duration::from_secs(300), Duration::from_millis(250));
    router(AppState::new(Authorizer::new(TokenGenerator::new(), cache)))
}

async fn post_authorize(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/authorize")
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn gateway_event() -> String {
    json!({
        "type": "REQUEST",
        "methodArn": ARN,
        "requestContext": { "requestId": "c0ffee-42", "httpMethod": "GET", "resourcePath": "/orders" },
        "headers": { "host": "orders.example.com", "accept": "*/*" }
    })
    .to_string()
}

#[tokio::test]
async fn healthy_cache_allows_and_records_token() {
    let store = Arc::new(MemoryTokenStore::new(16));
    let (status, body) = post_authorize(app_over(store.clone()), gateway_event()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["principalId"], "user");
    assert_eq!(body["policyDocument"]["Version"], "2012-10-17");
    let statement = &body["policyDocument"]["Statement"][0];
    assert_eq!(statement["Action"], "execute-api:Invoke");
    assert_eq!(statement["Effect"], "Allow");
    assert_eq!(statement["Resource"], ARN);

    let context = &body["context"];
    let token = context["accessToken"].as_str().unwrap();
    assert!(TokenValue::is_well_formed(token));
    assert_eq!(context["userId"], "user");
    assert_eq!(context["requestId"], "c0ffee-42");
    assert_eq!(context["cached"], true);
    assert!(context["timestamp"].as_str().unwrap().ends_with('Z'));

    let record: Value = serde_json::from_str(&store.get(token).unwrap()).unwrap();
    assert_eq!(record["token"], token);
    assert_eq!(record["host"], "orders.example.com");
    assert_eq!(record["valid"], true);
}

#[tokio::test]
async fn cache_outage_still_allows() {
    let (status, body) = post_authorize(app_over(Arc::new(DownStore)), gateway_event()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["policyDocument"]["Statement"][0]["Effect"], "Allow");
    assert_eq!(body["policyDocument"]["Statement"][0]["Resource"], ARN);
    assert_eq!(body["context"]["cached"], false);
    assert_eq!(body["context"]["requestId"], "c0ffee-42");
}

#[tokio::test]
async fn event_without_method_arn_gets_fallback_policy() {
    let store = Arc::new(MemoryTokenStore::new(16));
    let event = json!({ "requestContext": { "requestId": "r-1" } }).to_string();
    let (status, body) = post_authorize(app_over(store.clone()), event).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["policyDocument"]["Statement"][0]["Effect"], "Allow");
    assert_eq!(body["policyDocument"]["Statement"][0]["Resource"], "*");
    assert_eq!(body["context"]["requestId"], "error-fallback");
    assert_eq!(body["context"]["cached"], false);
    assert!(TokenValue::is_well_formed(body["context"]["accessToken"].as_str().unwrap()));
    assert!(store.is_empty());
}

#[tokio::test]
async fn non_json_body_gets_fallback_policy() {
    let store = Arc::new(MemoryTokenStore::new(16));
    let (status, body) = post_authorize(app_over(store), "<xml/>").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["principalId"], "user");
    assert_eq!(body["policyDocument"]["Statement"][0]["Resource"], "*");
    assert_eq!(body["context"]["requestId"], "error-fallback");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = app_over(Arc::new(MemoryTokenStore::new(4)));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn health_reports_degraded_cache_with_200() {
    let (status, body) = get_json(app_over(Arc::new(DownStore)), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["cache"], "unavailable");
    assert_eq!(body["checks"]["cache_backend"], "down");

    let (status, body) = get_json(app_over(Arc::new(MemoryTokenStore::new(4))), "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (status, body) = get_json(app_over(Arc::new(MemoryTokenStore::new(4))), "/api-doc/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/authorize"]["post"].is_object());
}
