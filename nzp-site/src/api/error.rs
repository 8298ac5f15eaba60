//! HTTP error responses
//!
//! Every failure leaves the handler as `{"error": message}` JSON with a
//! status derived from the catalog error taxonomy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    /// Dashboard or mutation attempted without a role-holding session
    LoginRequired { login_url: String },
    /// Endpoint needs `x-session-id` and none was sent
    MissingSession,
    /// `x-session-id` is not a UUID
    InvalidSessionId(String),
    /// `x-session-id` names no open session
    UnknownSession,
    Domain(nzp_common::Error),
}

impl From<nzp_common::Error> for ApiError {
    fn from(e: nzp_common::Error) -> Self {
        ApiError::Domain(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use nzp_common::Error;

        let (status, message) = match self {
            ApiError::LoginRequired { login_url } => {
                let body = Json(json!({
                    "error": "Login with a creator account is required",
                    "login_url": login_url,
                }));
                return (StatusCode::UNAUTHORIZED, body).into_response();
            }
            ApiError::MissingSession => (
                StatusCode::BAD_REQUEST,
                "Missing x-session-id header".to_string(),
            ),
            ApiError::InvalidSessionId(raw) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid session id: {}", raw),
            ),
            ApiError::UnknownSession => (StatusCode::NOT_FOUND, "Unknown session".to_string()),
            ApiError::Domain(e) => {
                let status = match &e {
                    Error::Ownership { .. } => StatusCode::FORBIDDEN,
                    Error::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                    Error::Store(_) | Error::Database(_) => StatusCode::BAD_GATEWAY,
                    Error::NotFound(_) => StatusCode::NOT_FOUND,
                    Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    Error::Auth(_) | Error::Claims(_) => StatusCode::UNAUTHORIZED,
                    Error::Init(_) | Error::Io(_) | Error::Config(_) => {
                        error!("Internal error: {}", e);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
