//! Dispatch endpoint
//!
//! POST /api/v1/dispatch: route one conversation. The body is a
//! [`DispatchRequest`]; the response is always a `CallOutcome`, with 200 on
//! success and 503 when every candidate was exhausted.

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::{routing::post, Json, Router};
use medgate_llm::{CallOutcome, DispatchRequest, FailoverRouter};
use std::sync::Arc;

async fn dispatch(
    Extension(router): Extension<Arc<FailoverRouter>>,
    Json(request): Json<DispatchRequest>,
) -> (StatusCode, Json<CallOutcome>) {
    let outcome = router.dispatch(request).await;
    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(outcome))
}

/// Create the dispatch routes.
pub fn dispatch_routes() -> Router {
    Router::new().route("/api/v1/dispatch", post(dispatch))
}
