//! Web API module for medgate
//!
//! Provides REST API endpoints for:
//! - Health checks
//! - Dispatching conversations through the failover router
//! - Model availability and provider status
//! - Operator controls for budgets and circuit breakers

pub mod admin;
pub mod dispatch;
pub mod health;
pub mod models;

use axum::Router;

pub use admin::admin_routes;
pub use dispatch::dispatch_routes;
pub use health::health_routes;
pub use models::models_routes;

/// Create the API router with all endpoints
///
/// Handlers expect an `Extension<Arc<FailoverRouter>>` layer.
pub fn api_router() -> Router {
    Router::new()
        .merge(health_routes())
        .merge(dispatch_routes())
        .merge(models_routes())
        .merge(admin_routes())
}
