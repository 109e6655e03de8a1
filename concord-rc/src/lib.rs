//! concord-rc library - claim reconciliation service
//!
//! Cross-checks README, API spec, and test claims about an HTTP API and
//! produces a release-readiness signal with full evidence.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use concord_common::config::TomlConfig;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod reconcile;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration (read-only after startup)
    pub config: Arc<TomlConfig>,
    /// Service startup time, for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: TomlConfig) -> Self {
        Self {
            config: Arc::new(config),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let body_limit = state.config.server.max_body_bytes;

    Router::new()
        .route("/api/analyze", post(api::analyze))
        .route("/api/views", post(api::analyze_with_views))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
