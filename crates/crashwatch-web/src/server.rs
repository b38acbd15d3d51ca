//! Router assembly and listener.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crashwatch_core::DashboardPoller;

use crate::error::WebError;
use crate::routes;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub poller: Arc<DashboardPoller>,
}

impl AppState {
    pub fn new(poller: Arc<DashboardPoller>) -> Self {
        Self { poller }
    }
}

/// Builds the route tree with a permissive CORS layer.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/indicators/:key", get(routes::get_indicator))
        .route("/api/quotes/:instrument", get(routes::get_quote))
        .route("/api/crash-risk", get(routes::get_crash_risk))
        .route("/api/snapshot", get(routes::get_snapshot))
        .with_state(state)
        .layer(cors)
}

/// Binds `bind_addr` and serves until the listener fails.
pub async fn serve(state: AppState, bind_addr: &str) -> Result<(), WebError> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|source| WebError::Bind {
            addr: bind_addr.to_owned(),
            source,
        })?;

    tracing::info!(addr = bind_addr, "crashwatch api listening");
    axum::serve(listener, router(state))
        .await
        .map_err(WebError::Serve)
}
