//! Server initialization and main run loop
//!
//! Contains the main `run()` function that starts all server components.

use super::background_tasks::start_daily_reset_task;
use super::loader::load_config;
use super::providers::build_router;
use super::validation::validate_config;
use crate::api::api_router;
use anyhow::{Context, Result};
use axum::{routing::get, Extension, Router};
use medgate_llm::FailoverRouter;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

/// Build the HTTP application around a shared router
fn build_app(router: Arc<FailoverRouter>) -> Router {
    api_router()
        .route("/", get(|| async { "medgate LLM gateway" }))
        .layer(Extension(router))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the server
pub async fn run() -> Result<()> {
    info!("Starting medgate v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");

    validate_config(&config)?;

    let router = build_router(&config.llm)?;
    let enabled = router
        .registry()
        .providers()
        .iter()
        .filter(|p| p.spec().has_credential())
        .count();
    if enabled == 0 {
        warn!("No provider has a credential; every dispatch will be exhausted");
    }
    info!(
        providers = router.registry().len(),
        enabled, "Failover router ready"
    );

    let shutdown = CancellationToken::new();
    let reset_task = start_daily_reset_task(router.clone(), router.clock(), shutdown.clone());

    let app = build_app(router);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await
        .context("HTTP server error")?;

    // serve can also return without a signal
    shutdown.cancel();
    if let Err(e) = reset_task.await {
        warn!("Daily reset task error: {}", e);
    }

    info!("medgate shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use medgate_llm::ModelRegistry;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_app_serves_root_and_health() {
        let router = Arc::new(FailoverRouter::new(Arc::new(ModelRegistry::new())));
        let app = build_app(router);

        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"medgate LLM gateway");

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
