//! HTTP surface for the vault service
//!
//! `GET /metrics` renders the Prometheus registry and `GET /health` reports
//! liveness. Anything else is answered by the router's 404/405 handling.

use crate::metrics::Metrics;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

/// Shared handler state
#[derive(Clone, Debug)]
pub struct HttpState {
    /// Metrics rendered on `/metrics`
    pub metrics: Metrics,
    /// Service name reported on `/health`
    pub service: String,
    /// Service version reported on `/health`
    pub version: String,
}

/// Body of `/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests
    pub status: &'static str,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
}

/// Build the service router
pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn health_check(State(state): State<HttpState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.service,
        version: state.version,
    })
}

// Prometheus text exposition
async fn metrics_handler(State(state): State<HttpState>) -> (StatusCode, String) {
    match state.metrics.encode() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            tracing::error!("Failed to export metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to export metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app(metrics: Metrics) -> Router {
        router(HttpState {
            metrics,
            service: "vault-core".to_string(),
            version: "0.1.0".to_string(),
        })
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let metrics = Metrics::new().unwrap();
        metrics.record_operation("borrow", 0.001);

        let req = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let resp = test_app(metrics).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("vault_operations_total{op=\"borrow\"} 1"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = test_app(Metrics::new().unwrap()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["service"], "vault-core");
    }

    #[tokio::test]
    async fn test_wrong_method_and_path() {
        let app = test_app(Metrics::new().unwrap());

        let req = Request::builder()
            .method("POST")
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let req = Request::builder()
            .uri("/anything")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
