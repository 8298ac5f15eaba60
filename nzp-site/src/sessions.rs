//! Browser session registry
//!
//! One `SessionGate` per browser session, keyed by the id handed out on
//! `POST /api/session`. A login token is redeemed at most once while it can
//! still be valid: a fragment replayed from history opens an anonymous
//! session instead.
//!
//! The registry is bounded. Signing out ends the session, idle sessions are
//! swept, and opening past `max_sessions` evicts the least recently used.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use nzp_common::config::{ServerConfig, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE_SECS};
use nzp_common::events::{EventBus, SiteEvent};
use nzp_common::identity::IdentityProvider;
use nzp_common::login::{initialize_with, FragmentSlot};
use nzp_common::session::{AuthState, SessionGate};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How often the background sweep runs
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Custom login tokens expire an hour after they are minted
pub const REDEEMED_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub idle: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl SessionLimits {
    pub fn from_config(server: &ServerConfig) -> Self {
        Self {
            idle: server.session_idle(),
            max_sessions: server.max_sessions.max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenedSession {
    pub id: Uuid,
    pub state: AuthState,
    /// Login problem to show the user, if any
    pub notice: Option<String>,
}

struct SessionEntry {
    gate: SessionGate,
    last_seen: Instant,
}

pub struct SessionRegistry {
    gates: RwLock<HashMap<Uuid, SessionEntry>>,
    /// Token -> when it was redeemed
    redeemed: Mutex<HashMap<String, Instant>>,
    limits: SessionLimits,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionLimits::default())
    }
}

impl SessionRegistry {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            gates: RwLock::new(HashMap::new()),
            redeemed: Mutex::new(HashMap::new()),
            limits,
        }
    }

    /// Run startup sign-in for a new browser session
    pub async fn open(
        &self,
        provider: &dyn IdentityProvider,
        fragment: Option<String>,
        events: &EventBus,
    ) -> OpenedSession {
        let mut slot = FragmentSlot::new(fragment);
        let mut login = slot.take();

        let replayed = match login.as_ref().and_then(|f| f.redeemable_token()) {
            Some(token) => match self.redeemed.lock().await.entry(token.to_string()) {
                Entry::Occupied(_) => true,
                Entry::Vacant(vacant) => {
                    vacant.insert(Instant::now());
                    false
                }
            },
            None => false,
        };
        if replayed {
            warn!("Login token already redeemed, ignoring fragment");
            login = None;
        }

        let outcome = initialize_with(provider, login).await;
        let mut gate = SessionGate::new();
        let state = gate
            .on_auth_change(outcome.user.as_ref(), provider)
            .await
            .clone();

        let id = Uuid::new_v4();
        let mut gates = self.gates.write().await;
        if gates.len() >= self.limits.max_sessions {
            let oldest = gates
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                gates.remove(&oldest);
                info!("Session limit reached, evicted session {}", oldest);
            }
        }
        gates.insert(
            id,
            SessionEntry {
                gate,
                last_seen: Instant::now(),
            },
        );
        drop(gates);

        info!("Opened session {} ({})", id, state.kind());
        announce(events, id, &state);

        OpenedSession {
            id,
            state,
            notice: outcome.notice,
        }
    }

    /// Current gate state, `None` for unknown ids. Counts as activity.
    pub async fn state(&self, id: &Uuid) -> Option<AuthState> {
        let mut gates = self.gates.write().await;
        let entry = gates.get_mut(id)?;
        entry.last_seen = Instant::now();
        Some(entry.gate.state().clone())
    }

    /// Sign the session out and forget it
    ///
    /// Returns the final `Unauthenticated` state, `None` for unknown ids.
    pub async fn sign_out(
        &self,
        id: &Uuid,
        provider: &dyn IdentityProvider,
        events: &EventBus,
    ) -> Option<AuthState> {
        let mut entry = self.gates.write().await.remove(id)?;
        let state = entry.gate.on_auth_change(None, provider).await.clone();

        info!("Signed out session {}", id);
        announce(events, *id, &state);
        Some(state)
    }

    /// Drop sessions idle since before `now - idle` and forget redeemed
    /// tokens old enough to have expired. Returns the sessions removed.
    pub async fn sweep(&self, now: Instant) -> usize {
        let idle = self.limits.idle;
        let mut gates = self.gates.write().await;
        let before = gates.len();
        gates.retain(|_, entry| now.saturating_duration_since(entry.last_seen) < idle);
        let removed = before - gates.len();
        drop(gates);

        self.redeemed
            .lock()
            .await
            .retain(|_, at| now.saturating_duration_since(*at) < REDEEMED_TOKEN_TTL);
        removed
    }

    /// Sweep every `every` until the runtime shuts down
    pub async fn run_sweeper(self: Arc<Self>, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = self.sweep(Instant::now()).await;
            if removed > 0 {
                info!("Expired {} idle sessions", removed);
            } else {
                debug!("Session sweep found nothing idle");
            }
        }
    }

    pub async fn count(&self) -> usize {
        self.gates.read().await.len()
    }
}

fn announce(events: &EventBus, session_id: Uuid, state: &AuthState) {
    events.emit_lossy(SiteEvent::AuthChanged {
        session_id,
        state: state.kind().to_string(),
        can_access_dashboard: state.can_access_dashboard(),
        timestamp: chrono::Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nzp_common::identity::{IdentityClaims, ProviderUser};
    use nzp_common::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CreatorProvider {
        redemptions: AtomicUsize,
    }

    impl CreatorProvider {
        fn new() -> Self {
            Self {
                redemptions: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for CreatorProvider {
        async fn sign_in_with_custom_token(&self, _token: &str) -> Result<ProviderUser> {
            self.redemptions.fetch_add(1, Ordering::SeqCst);
            Ok(ProviderUser {
                uid: "123456".to_string(),
                display_name: None,
                photo_url: None,
                is_anonymous: false,
                id_token: None,
            })
        }

        async fn sign_in_anonymously(&self) -> Result<ProviderUser> {
            Ok(ProviderUser {
                uid: "anon".to_string(),
                display_name: None,
                photo_url: None,
                is_anonymous: true,
                id_token: None,
            })
        }

        async fn fetch_claims(&self, user: &ProviderUser) -> Result<IdentityClaims> {
            Ok(IdentityClaims {
                discord_username: Some("packmaker".to_string()),
                discord_pfp: None,
                has_role: !user.is_anonymous,
            })
        }
    }

    const FRAGMENT: &str = "#token=abc&discord_username=packmaker&status=success";

    fn limits(max_sessions: usize) -> SessionLimits {
        SessionLimits {
            idle: Duration::from_secs(60),
            max_sessions,
        }
    }

    #[tokio::test]
    async fn test_open_with_fragment_grants_dashboard() {
        let provider = CreatorProvider::new();
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let registry = SessionRegistry::default();

        let opened = registry
            .open(&provider, Some(FRAGMENT.to_string()), &bus)
            .await;
        assert!(opened.state.can_access_dashboard());
        assert_eq!(registry.state(&opened.id).await, Some(opened.state.clone()));

        match rx.recv().await.unwrap() {
            SiteEvent::AuthChanged {
                session_id,
                can_access_dashboard,
                ..
            } => {
                assert_eq!(session_id, opened.id);
                assert!(can_access_dashboard);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_replayed_token_not_redeemed_twice() {
        let provider = CreatorProvider::new();
        let bus = EventBus::new(10);
        let registry = SessionRegistry::default();

        registry
            .open(&provider, Some(FRAGMENT.to_string()), &bus)
            .await;
        let replay = registry
            .open(&provider, Some(FRAGMENT.to_string()), &bus)
            .await;

        assert_eq!(provider.redemptions.load(Ordering::SeqCst), 1);
        assert!(!replay.state.can_access_dashboard());
        assert_eq!(registry.count().await, 2);
    }

    #[tokio::test]
    async fn test_sign_out_forgets_session() {
        let provider = CreatorProvider::new();
        let bus = EventBus::new(10);
        let registry = SessionRegistry::default();

        for _ in 0..100 {
            let opened = registry.open(&provider, None, &bus).await;
            let state = registry.sign_out(&opened.id, &provider, &bus).await;
            assert_eq!(state, Some(AuthState::Unauthenticated));
            assert!(registry.state(&opened.id).await.is_none());
        }
        assert_eq!(registry.count().await, 0);
        assert!(registry.sign_out(&Uuid::new_v4(), &provider, &bus).await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_drops_idle_sessions() {
        let provider = CreatorProvider::new();
        let bus = EventBus::new(10);
        let registry = SessionRegistry::new(limits(100));

        for _ in 0..5 {
            registry.open(&provider, None, &bus).await;
        }
        assert_eq!(registry.sweep(Instant::now()).await, 0);
        assert_eq!(registry.count().await, 5);

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(registry.sweep(later).await, 5);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_expires_redeemed_tokens() {
        let provider = CreatorProvider::new();
        let bus = EventBus::new(10);
        let registry = SessionRegistry::new(limits(100));

        registry
            .open(&provider, Some(FRAGMENT.to_string()), &bus)
            .await;
        registry
            .sweep(Instant::now() + REDEEMED_TOKEN_TTL + Duration::from_secs(1))
            .await;
        assert!(registry.redeemed.lock().await.is_empty());

        // Past its lifetime the token is left to the provider to reject
        registry
            .open(&provider, Some(FRAGMENT.to_string()), &bus)
            .await;
        assert_eq!(provider.redemptions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_open_past_limit_evicts_least_recent() {
        let provider = CreatorProvider::new();
        let bus = EventBus::new(10);
        let registry = SessionRegistry::new(limits(2));

        let first = registry.open(&provider, None, &bus).await;
        let second = registry.open(&provider, None, &bus).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        // Touch the first so the second is the stalest
        assert!(registry.state(&first.id).await.is_some());
        let third = registry.open(&provider, None, &bus).await;

        assert_eq!(registry.count().await, 2);
        assert!(registry.state(&first.id).await.is_some());
        assert!(registry.state(&second.id).await.is_none());
        assert!(registry.state(&third.id).await.is_some());
    }
}
