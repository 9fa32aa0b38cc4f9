use super::*;
use crate::config::ConversionConfig;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;


/// Router over the default configuration
fn test_router() -> Router {
    create_router(Arc::new(Config::default())).unwrap()
}

/// Read a response body as JSON
async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Build a POST /convert request carrying `config` as JSON
fn convert_request(config: &ConversionConfig) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/convert")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(config).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let mut config = Config::default();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let api_handle = tokio::spawn(start_api_server(config));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be serving");

    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let mut config = Config::default();
    config.api.cors_enabled = false;
    let app = create_router(Arc::new(config)).unwrap();

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be absent"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let mut config = Config::default();
    config.api.cors_origins = vec!["http://dashboard.local".to_string()];
    let app = create_router(Arc::new(config)).unwrap();

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://dashboard.local")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://dashboard.local")
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let request = Request::builder()
        .uri("/downloads")
        .body(Body::empty())
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
