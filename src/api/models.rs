//! Model availability endpoint
//!
//! GET /api/v1/models: every model with whether it can be tried now, plus
//! per-provider budget and breaker state.

use axum::extract::Extension;
use axum::{routing::get, Json, Router};
use medgate_llm::{FailoverRouter, ModelAvailability, ProviderStatus};
use serde::Serialize;
use std::sync::Arc;

/// Response for GET /api/v1/models
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelAvailability>,
    pub providers: Vec<ProviderStatus>,
}

async fn list_models(Extension(router): Extension<Arc<FailoverRouter>>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: router.list_models_with_availability().await,
        providers: router.provider_status().await,
    })
}

/// Create the model listing routes.
pub fn models_routes() -> Router {
    Router::new().route("/api/v1/models", get(list_models))
}
