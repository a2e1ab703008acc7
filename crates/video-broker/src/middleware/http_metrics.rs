//! HTTP metrics middleware for capturing all request/response metrics
//!
//! Runs outside the router so that responses produced before a handler
//! runs (unknown route, wrong method, malformed query string) are counted
//! too.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records method, normalized path, status and duration
/// for every response.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn handler_200() -> &'static str {
        "OK"
    }

    async fn handler_502() -> (StatusCode, &'static str) {
        (StatusCode::BAD_GATEWAY, "Upstream")
    }

    fn test_app() -> Router {
        Router::new()
            .route("/health", get(handler_200))
            .route("/sessions/:id", get(handler_502))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    async fn status_of(uri: &str, method: &str) -> StatusCode {
        let request = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request builder should succeed");

        test_app()
            .oneshot(request)
            .await
            .expect("request should succeed")
            .status()
    }

    #[tokio::test]
    async fn test_middleware_passes_success_through() {
        assert_eq!(status_of("/health", "GET").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_passes_error_through() {
        assert_eq!(status_of("/sessions/S1", "GET").await, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_middleware_sees_framework_rejections() {
        assert_eq!(status_of("/nonexistent", "GET").await, StatusCode::NOT_FOUND);
        assert_eq!(
            status_of("/health", "DELETE").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
