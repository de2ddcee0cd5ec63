//! HTTP transport for the command API.
//!
//! `POST /api/versions` accepts the same JSON request the in-process API
//! does and answers with the same envelope. The HTTP status mirrors the
//! envelope's `code`.

use crate::api::VersionControlApi;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Create the router.
pub fn create_router(api: Arc<VersionControlApi>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/versions", post(handle))
        .with_state(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(json!({
        "healthy": true,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn handle(State(api): State<Arc<VersionControlApi>>, body: Bytes) -> impl IntoResponse {
    let request: Value = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Rejected malformed request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "status": "error",
                    "message": "Malformed request body",
                    "code": 400,
                })),
            );
        }
    };

    let response = api.handle_request(request).await;
    let status = response["code"]
        .as_u64()
        .and_then(|code| u16::try_from(code).ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Backends, Services};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use versa_core::VersaConfig;

    fn router() -> Router {
        create_router(Services::build(Backends::memory(), &VersaConfig::default()).api)
    }

    async fn post_json(router: Router, body: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::post("/api/versions")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_version() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_version_over_http() {
        let (status, body) = post_json(
            router(),
            r#"{"action": "create_version", "params": {"content_id": 1, "content": "hi", "user_id": 2}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert!(body["version_id"].as_i64().is_some());
    }

    #[tokio::test]
    async fn error_code_becomes_http_status() {
        let (status, body) = post_json(router(), r#"{"action": "nope"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid action");

        let (status, body) = post_json(
            router(),
            r#"{"action": "get_version_content", "params": {"version_id": 99}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let (status, body) = post_json(router(), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }
}
