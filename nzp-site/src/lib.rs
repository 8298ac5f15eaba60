//! nzp-site library - NZ Packs catalog site
//!
//! HTTP front end over the scenepack catalog: filtered catalog pages, the
//! creator dashboard, Discord login hand-off and live catalog updates.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use nzp_common::config::SiteConfig;
use nzp_common::events::EventBus;
use nzp_common::identity::IdentityProvider;
use nzp_common::images::ImageProbe;
use nzp_common::mutation::MutationGateway;
use nzp_common::view::ViewController;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod identity;
pub mod images;
pub mod sessions;

use sessions::{SessionLimits, SessionRegistry};

/// Event bus capacity per subscriber
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Settings resolved from `[images]` and `[server]`
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub placeholder_url: String,
    pub image_timeout: Duration,
    pub session_limits: SessionLimits,
}

impl SiteSettings {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            placeholder_url: config.images.placeholder_url.clone(),
            image_timeout: config.images.timeout(),
            session_limits: SessionLimits::from_config(&config.server),
        }
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub view: Arc<ViewController>,
    pub gateway: Arc<MutationGateway>,
    pub identity: Arc<dyn IdentityProvider>,
    pub images: Arc<dyn ImageProbe>,
    pub sessions: Arc<SessionRegistry>,
    pub events: EventBus,
    pub settings: Arc<SiteSettings>,
}

impl AppState {
    pub fn new(
        view: Arc<ViewController>,
        gateway: MutationGateway,
        identity: Arc<dyn IdentityProvider>,
        images: Arc<dyn ImageProbe>,
        events: EventBus,
        settings: SiteSettings,
    ) -> Self {
        Self {
            view,
            gateway: Arc::new(gateway),
            identity,
            images,
            sessions: Arc::new(SessionRegistry::new(settings.session_limits)),
            events,
            settings: Arc::new(settings),
        }
    }
}

/// Build application router
///
/// `/health` is public. Every `/api` route runs behind the session
/// middleware, which resolves `x-session-id` for the handlers.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    let api = Router::new()
        .route("/api/config", get(api::get_config))
        .route("/api/pages/:page", get(api::get_page))
        .route("/api/pages/:page/genres", get(api::get_genres))
        .route(
            "/api/session",
            get(api::get_session)
                .post(api::open_session)
                .delete(api::close_session),
        )
        .route("/api/dashboard", get(api::get_dashboard))
        .route("/api/entries", post(api::create_entry))
        .route(
            "/api/entries/:id",
            put(api::update_entry).delete(api::delete_entry),
        )
        .route("/api/events", get(api::event_stream))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::session_middleware,
        ));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
