//! Browser-facing site settings

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub login_url: String,
    pub placeholder_image_url: String,
    pub image_timeout_secs: u64,
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        login_url: state.view.login_url().to_string(),
        placeholder_image_url: state.settings.placeholder_url.clone(),
        image_timeout_secs: state.settings.image_timeout.as_secs(),
    })
}
