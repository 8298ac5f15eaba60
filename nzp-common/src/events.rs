//! Event types for the NZ Packs event system
//!
//! Provides the site-wide event enum and the EventBus that carries it to SSE
//! clients. Events are announcements only: a client that sees
//! `CatalogReplaced` re-requests its current page.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SiteEvent {
    /// The view controller swapped in a new catalog snapshot
    ///
    /// Triggers:
    /// - SSE: every page re-runs its filter
    CatalogReplaced {
        revision: u64,
        entry_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The live-query channel reported an error; the previous snapshot stays
    CatalogError {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A browser session changed auth state
    AuthChanged {
        session_id: Uuid,
        /// `uninitialized`, `unauthenticated` or `authenticated`
        state: String,
        can_access_dashboard: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SiteEvent {
    /// SSE event name
    pub fn event_type(&self) -> &str {
        match self {
            SiteEvent::CatalogReplaced { .. } => "CatalogReplaced",
            SiteEvent::CatalogError { .. } => "CatalogError",
            SiteEvent::AuthChanged { .. } => "AuthChanged",
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally: publishing never blocks, any number of
/// subscribers may attach, and slow subscribers observe `Lagged` instead of
/// stalling producers.
///
/// # Examples
///
/// ```
/// use nzp_common::events::{EventBus, SiteEvent};
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(SiteEvent::CatalogReplaced {
///     revision: 1,
///     entry_count: 0,
///     timestamp: chrono::Utc::now(),
/// });
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SiteEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SiteEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SiteEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
