//! Observability HTTP Routes
//!
//! Liveness probe for load balancers and dashboards.

use axum::{routing::get, Router};

/// Health check route, mounted under `/api`
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_handler))
}

/// Health check handler
async fn health_handler() -> &'static str {
    "ok"
}
