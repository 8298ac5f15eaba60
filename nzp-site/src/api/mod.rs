//! HTTP API handlers for nzp-site

pub mod entries;
pub mod error;
pub mod health;
pub mod pages;
pub mod session;
pub mod settings;
pub mod sse;

pub use entries::{create_entry, delete_entry, update_entry};
pub use error::ApiError;
pub use health::health_routes;
pub use pages::{get_dashboard, get_genres, get_page};
pub use session::{
    close_session, get_session, open_session, session_middleware, CurrentSession, SESSION_HEADER,
};
pub use settings::get_config;
pub use sse::event_stream;
