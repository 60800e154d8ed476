//! Health check endpoint
//!
//! `/health` returns "healthy", the version and how many providers have a
//! credential (for load balancers and quick checks).

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use medgate_llm::FailoverRouter;
use serde::Serialize;
use std::sync::Arc;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub providers: usize,
    pub providers_enabled: usize,
}

async fn health(Extension(router): Extension<Arc<FailoverRouter>>) -> Json<HealthResponse> {
    let providers = router.registry().providers();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        providers: providers.len(),
        providers_enabled: providers
            .iter()
            .filter(|p| p.spec().has_credential())
            .count(),
    })
}

/// Create the health routes.
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health))
}
