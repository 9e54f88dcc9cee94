//! HTTP server state and lifecycle.

use crate::coordinator::Coordinator;
use crate::inventory::DeviceRegistry;
use crate::routes;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state handed to every route handler.
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub registry: Arc<DeviceRegistry>,
}

pub type AppStateArc = Arc<AppState>;

pub fn build_router(state: AppStateArc) -> Router {
    routes::api_routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until ctrl-c. In-flight requests complete naturally.
pub async fn run(listen: &str, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!("command surface listening on {listen}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("HTTP server error")
}
