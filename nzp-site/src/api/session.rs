//! Session endpoints and the session middleware
//!
//! The browser opens a session once per tab load, posting the URL fragment it
//! arrived with, then sends the returned id in `x-session-id` on every call.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use nzp_common::session::{AuthSession, AuthState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiError;
use crate::AppState;

pub const SESSION_HEADER: &str = "x-session-id";

/// Session attached to the request by `session_middleware`
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: Option<Uuid>,
    /// `None` when no header was sent or the id is unknown
    pub state: Option<AuthState>,
}

impl CurrentSession {
    /// Gate state as the handlers see it; no session reads as uninitialized
    pub fn auth(&self) -> AuthState {
        self.state.clone().unwrap_or(AuthState::Uninitialized)
    }

    /// Role-holding session, or a login prompt
    pub fn require_creator(&self, login_url: &str) -> Result<AuthSession, ApiError> {
        self.state
            .as_ref()
            .and_then(AuthState::dashboard_session)
            .cloned()
            .ok_or_else(|| ApiError::LoginRequired {
                login_url: login_url.to_string(),
            })
    }
}

/// Resolve `x-session-id` into a `CurrentSession` extension
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let id = match request.headers().get(SESSION_HEADER) {
        None => None,
        Some(value) => {
            let raw = value.to_str().unwrap_or_default();
            let id = Uuid::parse_str(raw.trim())
                .map_err(|_| ApiError::InvalidSessionId(raw.to_string()))?;
            Some(id)
        }
    };

    let session_state = match &id {
        Some(id) => state.sessions.state(id).await,
        None => None,
    };

    request.extensions_mut().insert(CurrentSession {
        id,
        state: session_state,
    });
    Ok(next.run(request).await)
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionRequest {
    /// `location.hash` the page was loaded with
    #[serde(default)]
    pub fragment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub auth: AuthState,
    pub can_access_dashboard: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl SessionResponse {
    fn new(session_id: Uuid, auth: AuthState, notice: Option<String>) -> Self {
        Self {
            session_id,
            can_access_dashboard: auth.can_access_dashboard(),
            auth,
            notice,
        }
    }
}

/// POST /api/session
///
/// Runs the login initializer. The response is the new session; the client
/// must strip the fragment from its address bar.
pub async fn open_session(
    State(state): State<AppState>,
    Json(body): Json<OpenSessionRequest>,
) -> impl IntoResponse {
    let opened = state
        .sessions
        .open(state.identity.as_ref(), body.fragment, &state.events)
        .await;

    (
        StatusCode::CREATED,
        Json(SessionResponse::new(opened.id, opened.state, opened.notice)),
    )
}

/// GET /api/session
pub async fn get_session(
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = current.id.ok_or(ApiError::MissingSession)?;
    let auth = current.state.ok_or(ApiError::UnknownSession)?;
    Ok(Json(SessionResponse::new(id, auth, None)))
}

/// DELETE /api/session
///
/// Signs out and ends the session; later calls with this id get 404.
pub async fn close_session(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = current.id.ok_or(ApiError::MissingSession)?;
    let auth = state
        .sessions
        .sign_out(&id, state.identity.as_ref(), &state.events)
        .await
        .ok_or(ApiError::UnknownSession)?;
    Ok(Json(SessionResponse::new(id, auth, None)))
}
