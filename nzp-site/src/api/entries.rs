//! Scenepack create/update/delete
//!
//! Mutations require a role-holding session. Ownership is checked against
//! the current snapshot before the store is called; the change becomes
//! visible only when the store's next live-query push arrives.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use nzp_common::{EntryDraft, Error, ScenepackEntry};
use serde_json::json;

use super::{ApiError, CurrentSession};
use crate::AppState;

async fn existing(state: &AppState, id: &str) -> Result<ScenepackEntry, ApiError> {
    state
        .view
        .find(id)
        .await
        .ok_or_else(|| Error::NotFound(format!("scenepack {}", id)).into())
}

/// POST /api/entries
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(draft): Json<EntryDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = current.require_creator(state.view.login_url())?;
    let fields = draft.validate()?;
    let id = state.gateway.create(&actor, &fields).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// PUT /api/entries/:id
///
/// Replaces every editable field; `creatorId` is kept.
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<String>,
    Json(draft): Json<EntryDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = current.require_creator(state.view.login_url())?;
    let fields = draft.validate()?;
    let entry = existing(&state, &id).await?;
    state.gateway.update(&actor, &entry, &fields).await?;
    Ok(Json(json!({ "id": id })))
}

/// DELETE /api/entries/:id
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = current.require_creator(state.view.login_url())?;
    let entry = existing(&state, &id).await?;
    state.gateway.delete(&actor, &entry).await?;
    Ok(StatusCode::NO_CONTENT)
}
