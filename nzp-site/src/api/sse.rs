//! Server-Sent Events for catalog and session changes

use crate::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use nzp_common::events::SiteEvent;
use serde::Deserialize;
use std::convert::Infallible;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    /// Session whose `AuthChanged` events this client receives
    #[serde(default)]
    pub session: Option<Uuid>,
}

/// GET /api/events?session=UUID
///
/// Streams events:
/// - CatalogReplaced (re-request the current page)
/// - CatalogError
/// - AuthChanged (own session only)
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session = query.session;
    nzp_common::sse::create_event_sse_stream(&state.events, "nzp-site", move |event| {
        match event {
            SiteEvent::AuthChanged { session_id, .. } => Some(*session_id) == session,
            _ => true,
        }
    })
}
