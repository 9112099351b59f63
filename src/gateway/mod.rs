//! JSON HTTP gateway over a [`TrainingConsole`].

pub mod api;

use crate::catalog::CatalogKind;
use crate::config::Config;
use crate::console::TrainingConsole;
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub console: Arc<TrainingConsole>,
    pub config: Arc<Config>,
}

/// Build the full router with body-size and timeout limits from `[gateway]`.
pub fn build_router(state: AppState) -> Router {
    let max_body_bytes = state.config.gateway.max_body_bytes;
    let request_timeout = Duration::from_secs(state.config.gateway.request_timeout_secs);

    let mut router = Router::new()
        .route("/health", get(api::handle_health))
        .route("/api/status", get(api::handle_api_status))
        .route("/api/config", get(api::handle_api_config_get))
        .route(
            "/api/sessions",
            get(api::handle_sessions_list).post(api::handle_session_create),
        )
        .route(
            "/api/sessions/{id}",
            get(api::handle_session_get).delete(api::handle_session_delete),
        )
        .route("/api/sessions/{id}/status", post(api::handle_session_status))
        .route("/api/sessions/{id}/payload", get(api::handle_session_payload));

    for kind in [
        CatalogKind::Scenarios,
        CatalogKind::Avatars,
        CatalogKind::Observers,
    ] {
        router = router
            .route(
                &format!("/api/{}", kind.as_str()),
                get(api::handle_catalog_search)
                    .post(api::handle_catalog_create)
                    .layer(Extension(kind)),
            )
            .route(
                &format!("/api/{}/{{id}}", kind.as_str()),
                get(api::handle_catalog_get)
                    .put(api::handle_catalog_update)
                    .delete(api::handle_catalog_delete)
                    .layer(Extension(kind)),
            );
    }

    router
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Serve the gateway on `host:port` until `shutdown` resolves.
///
/// The console is left running; the caller shuts it down afterwards.
pub async fn run_gateway<F>(
    host: &str,
    port: u16,
    config: Arc<Config>,
    console: Arc<TrainingConsole>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind gateway to {addr}"))?;
    let local_addr = listener.local_addr()?;

    tracing::info!(address = %local_addr, "gateway listening");

    let app = build_router(AppState { console, config });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Gateway server error")?;

    tracing::info!("gateway stopped");
    Ok(())
}
