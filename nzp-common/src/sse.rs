//! Server-Sent Events (SSE) utilities
//!
//! Bridges the EventBus onto an SSE response.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::events::{EventBus, SiteEvent};

/// Interval between heartbeat comments
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// SSE stream of the SiteEvents emitted after the client connects
///
/// Only events accepted by `visible` are forwarded. Sends
/// `ConnectionStatus: connected` first. A lagging client gets a `Resync`
/// event in place of the dropped events so it re-requests its page.
pub fn create_event_sse_stream<F>(
    bus: &EventBus,
    service_name: &'static str,
    visible: F,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    F: Fn(&SiteEvent) -> bool + Send + Sync + 'static,
{
    info!("New SSE client connected to {} events", service_name);
    let mut rx = bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) if !visible(&event) => {}
                Ok(event) => {
                    match serde_json::to_string(&event) {
                        Ok(data) => yield Ok(Event::default().event(event.event_type()).data(data)),
                        Err(e) => warn!("SSE: failed to serialize {}: {}", event.event_type(), e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("SSE: client lagged by {} events", skipped);
                    yield Ok(Event::default().event("Resync").data(skipped.to_string()));
                }
                Err(RecvError::Closed) => {
                    info!("SSE: {} event bus closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
