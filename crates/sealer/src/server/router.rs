//! Axum router construction.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// Request bodies larger than `max_body_bytes` are refused with `413`.
pub fn build(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/v1/seal", post(handlers::seal))
        .route("/v1/unseal", post(handlers::unseal))
        .route("/v1/credentials", post(handlers::issue_credential))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::engine::{SealPolicy, Sealer};
    use crate::testutil;

    fn app(max_body_bytes: usize) -> Router {
        let sealer = Sealer::new(testutil::test_keys(), SealPolicy::default());
        build(AppState::new(sealer), max_body_bytes)
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app(1024).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn health_route_exists() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app(1024).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn oversized_body_is_refused() {
        let body = serde_json::json!({"principal_id": 1, "payload": "A".repeat(256)});
        let req = Request::builder()
            .method("POST")
            .uri("/v1/seal")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app(64).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 413);
    }

    #[tokio::test]
    async fn seal_requires_post() {
        let req = Request::builder()
            .uri("/v1/seal")
            .body(Body::empty())
            .unwrap();
        let resp = app(1024).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 405);
    }
}
