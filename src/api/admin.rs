//! Operator endpoints for budgets and circuit breakers
//!
//! - POST /api/v1/usage/reset: zero every provider's daily usage
//! - POST /api/v1/providers/reset: clear every provider block
//! - POST /api/v1/providers/:name/trip: block a provider until midnight
//! - POST /api/v1/providers/:name/reset: clear one provider block

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::post, Json, Router};
use medgate_llm::{Error, FailoverRouter, TokenUsageRow};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Body of POST /api/v1/providers/:name/trip
#[derive(Debug, Default, Deserialize)]
pub struct TripRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Response for POST /api/v1/usage/reset
#[derive(Debug, Serialize)]
pub struct UsageResetResponse {
    pub cleared_tokens: u64,
    pub usage: Vec<TokenUsageRow>,
}

fn error_response(err: &Error) -> Response {
    let status = match err {
        Error::UnknownProvider(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn reset_usage(Extension(router): Extension<Arc<FailoverRouter>>) -> Json<UsageResetResponse> {
    let cleared_tokens = router.reset_token_usage().await;
    Json(UsageResetResponse {
        cleared_tokens,
        usage: router.token_usage().await,
    })
}

async fn trip_provider(
    Extension(router): Extension<Arc<FailoverRouter>>,
    Path(name): Path<String>,
    body: Option<Json<TripRequest>>,
) -> Response {
    let reason = body
        .and_then(|Json(b)| b.reason)
        .unwrap_or_else(|| "manual block".to_string());
    match router.trip_provider(&name, &reason).await {
        Ok(newly_blocked) => Json(json!({
            "provider": name,
            "newly_blocked": newly_blocked,
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn reset_all_blocks(Extension(router): Extension<Arc<FailoverRouter>>) -> StatusCode {
    router.reset_provider_blocks().await;
    StatusCode::NO_CONTENT
}

async fn reset_block(
    Extension(router): Extension<Arc<FailoverRouter>>,
    Path(name): Path<String>,
) -> Response {
    match router.reset_provider_block(&name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

/// Create the operator routes.
pub fn admin_routes() -> Router {
    Router::new()
        .route("/api/v1/usage/reset", post(reset_usage))
        .route("/api/v1/providers/reset", post(reset_all_blocks))
        .route("/api/v1/providers/:name/trip", post(trip_provider))
        .route("/api/v1/providers/:name/reset", post(reset_block))
}
