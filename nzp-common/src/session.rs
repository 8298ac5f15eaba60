//! Session/role gate
//!
//! Three-state machine driven by identity provider auth-state changes:
//!
//! ```text
//! Uninitialized --(provider ready, nobody signed in)--> Unauthenticated
//!       |                                                    |
//!       +-----------(user signed in)--> Authenticated <------+
//! ```
//!
//! Entering `Authenticated` always succeeds. A failed claims fetch downgrades
//! the session to `role_flag = false` with provider-native profile fields
//! instead of aborting into an error state.

use serde::Serialize;
use tracing::{info, warn};

use crate::identity::{IdentityClaims, IdentityProvider, ProviderUser};

/// Username shown when neither claims nor the provider profile carry one
pub const FALLBACK_USERNAME: &str = "Creator";

/// Default Discord avatar
pub const DEFAULT_AVATAR_URL: &str = "https://discord.com/assets/f838f7c1ed7bc7ca2d4b.png";

/// Effective identity of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    pub id: String,
    pub username: String,
    pub pfp: String,
    pub role_flag: bool,
    pub anonymous: bool,
}

impl AuthSession {
    fn from_claims(user: &ProviderUser, claims: IdentityClaims) -> Self {
        Self {
            id: user.uid.clone(),
            username: claims
                .discord_username
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| native_username(user)),
            pfp: claims
                .discord_pfp
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| native_pfp(user)),
            role_flag: claims.has_role,
            anonymous: user.is_anonymous,
        }
    }

    fn degraded(user: &ProviderUser) -> Self {
        Self {
            id: user.uid.clone(),
            username: native_username(user),
            pfp: native_pfp(user),
            role_flag: false,
            anonymous: user.is_anonymous,
        }
    }
}

fn native_username(user: &ProviderUser) -> String {
    user.display_name
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_USERNAME.to_string())
}

fn native_pfp(user: &ProviderUser) -> String {
    user.photo_url
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    /// Identity provider has not reported readiness yet
    Uninitialized,
    /// Provider reports no signed-in identity
    Unauthenticated,
    Authenticated(AuthSession),
}

impl AuthState {
    /// Short state name for logs and events
    pub fn kind(&self) -> &'static str {
        match self {
            AuthState::Uninitialized => "uninitialized",
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::Authenticated(_) => "authenticated",
        }
    }

    /// Session allowed onto the dashboard: authenticated with the role flag
    pub fn dashboard_session(&self) -> Option<&AuthSession> {
        match self {
            AuthState::Authenticated(session) if session.role_flag => Some(session),
            _ => None,
        }
    }

    pub fn can_access_dashboard(&self) -> bool {
        self.dashboard_session().is_some()
    }
}

/// Owns the auth state for one browser session
#[derive(Debug, Clone)]
pub struct SessionGate {
    state: AuthState,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub fn new() -> Self {
        Self {
            state: AuthState::Uninitialized,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Handle a provider auth-state change
    ///
    /// `None` means the provider is ready with nobody signed in. The state is
    /// recomputed from scratch on every call.
    pub async fn on_auth_change(
        &mut self,
        user: Option<&ProviderUser>,
        provider: &dyn IdentityProvider,
    ) -> &AuthState {
        let next = match user {
            None => AuthState::Unauthenticated,
            Some(user) => match provider.fetch_claims(user).await {
                Ok(claims) => AuthState::Authenticated(AuthSession::from_claims(user, claims)),
                Err(e) => {
                    warn!("Claims fetch failed for {}, continuing without role: {}", user.uid, e);
                    AuthState::Authenticated(AuthSession::degraded(user))
                }
            },
        };

        info!("Auth state: {} -> {}", self.state.kind(), next.kind());
        self.state = next;
        &self.state
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{Error, Result};
    use async_trait::async_trait;

    /// Provider stub with fixed claims behaviour
    pub(crate) struct StubProvider {
        pub claims: Option<IdentityClaims>,
    }

    #[async_trait]
    impl IdentityProvider for StubProvider {
        async fn sign_in_with_custom_token(&self, _token: &str) -> Result<ProviderUser> {
            Err(Error::Auth("not used".to_string()))
        }

        async fn sign_in_anonymously(&self) -> Result<ProviderUser> {
            Err(Error::Auth("not used".to_string()))
        }

        async fn fetch_claims(&self, _user: &ProviderUser) -> Result<IdentityClaims> {
            self.claims
                .clone()
                .ok_or_else(|| Error::Claims("token expired".to_string()))
        }
    }

    pub(crate) fn user(uid: &str) -> ProviderUser {
        ProviderUser {
            uid: uid.to_string(),
            display_name: Some("Native Name".to_string()),
            photo_url: None,
            is_anonymous: false,
            id_token: Some("header.payload.sig".to_string()),
        }
    }

    #[tokio::test]
    async fn test_starts_uninitialized() {
        let gate = SessionGate::new();
        assert_eq!(gate.state(), &AuthState::Uninitialized);
        assert!(!gate.state().can_access_dashboard());
    }

    #[tokio::test]
    async fn test_no_user_is_unauthenticated() {
        let provider = StubProvider { claims: None };
        let mut gate = SessionGate::new();
        let state = gate.on_auth_change(None, &provider).await;
        assert_eq!(state, &AuthState::Unauthenticated);
        assert!(state.dashboard_session().is_none());
    }

    #[tokio::test]
    async fn test_claims_grant_dashboard() {
        let provider = StubProvider {
            claims: Some(IdentityClaims {
                discord_username: Some("packmaker".to_string()),
                discord_pfp: Some("https://cdn.discordapp.com/avatars/1/a.png".to_string()),
                has_role: true,
            }),
        };
        let mut gate = SessionGate::new();
        gate.on_auth_change(Some(&user("u1")), &provider).await;

        let session = gate.state().dashboard_session().expect("role granted");
        assert_eq!(session.id, "u1");
        assert_eq!(session.username, "packmaker");
        assert_eq!(session.pfp, "https://cdn.discordapp.com/avatars/1/a.png");
    }

    #[tokio::test]
    async fn test_claims_failure_degrades_without_error() {
        let provider = StubProvider { claims: None };
        let mut gate = SessionGate::new();
        let state = gate.on_auth_change(Some(&user("u1")), &provider).await;

        match state {
            AuthState::Authenticated(session) => {
                assert!(!session.role_flag);
                assert_eq!(session.username, "Native Name");
                assert_eq!(session.pfp, DEFAULT_AVATAR_URL);
            }
            other => panic!("expected Authenticated, got {:?}", other),
        }
        assert!(!gate.state().can_access_dashboard());
    }

    #[tokio::test]
    async fn test_claims_without_role_keep_native_fallbacks() {
        let provider = StubProvider {
            claims: Some(IdentityClaims::default()),
        };
        let mut anon = user("anon-1");
        anon.display_name = None;
        anon.is_anonymous = true;

        let mut gate = SessionGate::new();
        gate.on_auth_change(Some(&anon), &provider).await;
        match gate.state() {
            AuthState::Authenticated(session) => {
                assert_eq!(session.username, FALLBACK_USERNAME);
                assert!(session.anonymous);
                assert!(!session.role_flag);
            }
            other => panic!("expected Authenticated, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sign_out_returns_to_unauthenticated() {
        let provider = StubProvider {
            claims: Some(IdentityClaims {
                has_role: true,
                ..Default::default()
            }),
        };
        let mut gate = SessionGate::new();
        gate.on_auth_change(Some(&user("u1")), &provider).await;
        assert!(gate.state().can_access_dashboard());

        gate.on_auth_change(None, &provider).await;
        assert_eq!(gate.state(), &AuthState::Unauthenticated);
    }
}
