//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint against a scripted
//! upstream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use toolcache::api::create_router;
use toolcache::error::TransportError;
use toolcache::fetch::{ApiCache, ApiRequest, Transport};
use toolcache::AppState;

// == Helper Functions ==

/// Upstream that replays scripted replies and records request paths.
#[derive(Default)]
struct ScriptedUpstream {
    calls: AtomicUsize,
    replies: Mutex<VecDeque<Result<Value, TransportError>>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedUpstream {
    fn with(replies: Vec<Result<Value, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedUpstream {
    async fn send(&self, request: &ApiRequest) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("connection refused".into())))
    }
}

fn create_test_app(upstream: Arc<ScriptedUpstream>) -> Router {
    let cache = ApiCache::new(upstream, 100, Duration::from_secs(300));
    create_router(AppState::new(cache))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// == Proxy Endpoint Tests ==

#[tokio::test]
async fn test_proxy_second_request_served_from_cache() {
    let upstream = ScriptedUpstream::with(vec![Ok(json!([{"name": "Linter"}]))]);
    let app = create_test_app(upstream.clone());

    let first = app.clone().oneshot(get("/api/tools?page=1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()["x-cache-status"], "fresh");

    let second = app.oneshot(get("/api/tools?page=1")).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(
        body_to_json(second.into_body()).await,
        json!([{"name": "Linter"}])
    );
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_proxy_param_order_shares_entry() {
    let upstream = ScriptedUpstream::with(vec![Ok(json!("listing"))]);
    let app = create_test_app(upstream.clone());

    app.clone()
        .oneshot(get("/api/tools?category=dev&search=ai"))
        .await
        .unwrap();
    let response = app
        .oneshot(get("/api/tools?search=ai&price=&category=dev"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_proxy_force_header_refreshes() {
    let upstream = ScriptedUpstream::with(vec![Ok(json!(1)), Ok(json!(2))]);
    let app = create_test_app(upstream.clone());

    app.clone().oneshot(get("/api/featured")).await.unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/featured")
                .header("x-cache-force", "true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(body_to_json(response.into_body()).await, json!(2));
    assert_eq!(upstream.calls(), 2);
    assert!(upstream.seen.lock().unwrap()[1].no_cache);
}

#[tokio::test]
async fn test_proxy_serves_stale_when_upstream_fails() {
    let upstream = ScriptedUpstream::with(vec![
        Ok(json!({"categories": ["dev"]})),
        Err(TransportError::Status {
            status: 503,
            body: "maintenance".into(),
        }),
    ]);
    let app = create_test_app(upstream.clone());

    app.clone().oneshot(get("/api/categories")).await.unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/categories")
                .header("x-cache-force", "1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache-status"], "stale");
    assert_eq!(
        body_to_json(response.into_body()).await,
        json!({"categories": ["dev"]})
    );
}

#[tokio::test]
async fn test_proxy_failure_without_cache() {
    let upstream = ScriptedUpstream::with(vec![Err(TransportError::RateLimited)]);
    let app = create_test_app(upstream);

    let response = app.oneshot(get("/api/tools")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("Too many requests"));
}

// == Search Endpoint Tests ==

#[tokio::test]
async fn test_search_maps_filters_to_params() {
    let upstream = ScriptedUpstream::with(vec![Ok(json!([]))]);
    let app = create_test_app(upstream.clone());

    let response = app
        .oneshot(get("/search?search=chat&keywords=ai&sort=name&price="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let seen = upstream.seen.lock().unwrap();
    assert_eq!(seen[0].path, "/tools");
    let params = seen[0].params.as_ref().unwrap();
    assert_eq!(params["search"], json!("chat"));
    assert_eq!(params["keywords"], json!(["ai"]));
    // Default sort and empty price are not sent
    assert!(params.get("sort").is_none());
    assert!(params.get("price").is_none());
}

// == Cache Management Tests ==

#[tokio::test]
async fn test_invalidate_then_refetch() {
    let upstream = ScriptedUpstream::with(vec![Ok(json!(1)), Ok(json!(2)), Ok(json!(3))]);
    let app = create_test_app(upstream.clone());

    app.clone().oneshot(get("/api/tools")).await.unwrap();
    app.clone().oneshot(get("/api/categories")).await.unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/cache?pattern=/tools")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response.into_body()).await["removed"], 1);

    let response = app.clone().oneshot(get("/api/tools")).await.unwrap();
    assert_eq!(body_to_json(response.into_body()).await, json!(3));

    let stats = app.oneshot(get("/cache/stats")).await.unwrap();
    let json = body_to_json(stats.into_body()).await;
    assert_eq!(json["total_entries"], 2);
    assert_eq!(json["evictions"], 1);
}

#[tokio::test]
async fn test_invalidate_rejects_two_selectors() {
    let app = create_test_app(ScriptedUpstream::with(vec![]));

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/cache?key=/tools&pattern=/tools")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(ScriptedUpstream::with(vec![]));

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
}
