//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    /// Catalog snapshot revision; 0 until the first live-query push
    pub catalog_revision: u64,
    pub open_sessions: usize,
    /// Connected live-update streams
    pub event_subscribers: usize,
}

/// GET /health
///
/// Does NOT require a session.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "nzp-site".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        catalog_revision: state.view.snapshot().await.revision,
        open_sessions: state.sessions.count().await,
        event_subscribers: state.events.subscriber_count(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
