//! Login handoff from the Discord login service
//!
//! After the OAuth round trip the login service sends the browser back with
//! a URL fragment:
//!
//! ```text
//! #token=...&discord_user_id=...&discord_username=...&discord_pfp=...&status=success
//! ```
//!
//! The fragment is read exactly once and stripped so a page refresh cannot
//! replay the token. A rejected custom token falls back to an anonymous
//! session; it never blocks the site.

use tracing::{info, warn};

use crate::identity::{IdentityProvider, ProviderUser};

/// Outcome codes reported by the login service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStatus {
    Success,
    ErrorNoCode,
    ErrorTokenExchange,
    ErrorNoAccessToken,
    ErrorFetchUserInfo,
    ErrorMissingUserId,
    ErrorRoleCheckFailed,
    ErrorRoleCheckConfigMissing,
    UnauthorizedRole,
    ErrorFirebaseToken,
    Unknown(String),
}

impl LoginStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "success" => LoginStatus::Success,
            "error_no_code" => LoginStatus::ErrorNoCode,
            "error_token_exchange" => LoginStatus::ErrorTokenExchange,
            "error_no_access_token" => LoginStatus::ErrorNoAccessToken,
            "error_fetch_user_info" => LoginStatus::ErrorFetchUserInfo,
            "error_missing_user_id" => LoginStatus::ErrorMissingUserId,
            "error_role_check_failed" => LoginStatus::ErrorRoleCheckFailed,
            "error_role_check_config_missing" => LoginStatus::ErrorRoleCheckConfigMissing,
            "unauthorized_role" => LoginStatus::UnauthorizedRole,
            "error_firebase_token" => LoginStatus::ErrorFirebaseToken,
            other => LoginStatus::Unknown(other.to_string()),
        }
    }

    /// Message shown to the user after an unsuccessful login
    pub fn notice(&self) -> Option<String> {
        let msg = match self {
            LoginStatus::Success => return None,
            LoginStatus::UnauthorizedRole => {
                "Your Discord account does not have the creator role required for the dashboard."
            }
            LoginStatus::ErrorRoleCheckFailed | LoginStatus::ErrorRoleCheckConfigMissing => {
                "Could not verify your Discord role. Please try again later."
            }
            LoginStatus::ErrorNoCode
            | LoginStatus::ErrorTokenExchange
            | LoginStatus::ErrorNoAccessToken => "Discord login was cancelled or failed. Please try again.",
            LoginStatus::ErrorFetchUserInfo | LoginStatus::ErrorMissingUserId => {
                "Could not read your Discord profile. Please try again."
            }
            LoginStatus::ErrorFirebaseToken => "Login succeeded but the session could not be created.",
            LoginStatus::Unknown(_) => "Login failed with an unexpected error.",
        };
        Some(msg.to_string())
    }
}

/// Parameters carried by the login-return fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginFragment {
    pub token: Option<String>,
    pub discord_username: Option<String>,
    pub discord_pfp: Option<String>,
    pub status: LoginStatus,
}

impl LoginFragment {
    /// Parse a fragment with or without the leading `#`
    ///
    /// Returns `None` for fragments that are not a login return (no
    /// `status` and no `token` parameter).
    pub fn parse(fragment: &str) -> Option<Self> {
        let raw = fragment.strip_prefix('#').unwrap_or(fragment);

        let mut token = None;
        let mut discord_username = None;
        let mut discord_pfp = None;
        let mut status = None;

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let value = Some(value.into_owned()).filter(|v| !v.is_empty());
            match key.as_ref() {
                "token" => token = value,
                "discord_username" => discord_username = value,
                "discord_pfp" => discord_pfp = value,
                "status" => status = value,
                _ => {}
            }
        }

        if status.is_none() && token.is_none() {
            return None;
        }

        Some(Self {
            token,
            discord_username,
            discord_pfp,
            // The login service always sends a status; a missing one is an error
            status: LoginStatus::parse(status.as_deref().unwrap_or("error")),
        })
    }

    /// Custom token to redeem, only for a successful login
    pub fn redeemable_token(&self) -> Option<&str> {
        match self.status {
            LoginStatus::Success => self.token.as_deref(),
            _ => None,
        }
    }
}

/// URL fragment that can be consumed once
#[derive(Debug, Default)]
pub struct FragmentSlot {
    fragment: Option<String>,
}

impl FragmentSlot {
    pub fn new(fragment: Option<String>) -> Self {
        Self { fragment }
    }

    /// Read and strip the fragment; later calls return `None`
    pub fn take(&mut self) -> Option<LoginFragment> {
        self.fragment.take().as_deref().and_then(LoginFragment::parse)
    }

    pub fn is_consumed(&self) -> bool {
        self.fragment.is_none()
    }
}

/// Result of startup sign-in
#[derive(Debug)]
pub struct InitOutcome {
    /// Signed-in user, `None` if the provider refused every sign-in path
    pub user: Option<ProviderUser>,
    /// User-facing notice about an unsuccessful login
    pub notice: Option<String>,
}

/// Sign in from the login fragment, falling back to an anonymous session
///
/// Consumes the slot: a second call signs in anonymously.
pub async fn initialize(provider: &dyn IdentityProvider, slot: &mut FragmentSlot) -> InitOutcome {
    initialize_with(provider, slot.take()).await
}

/// Sign in from an already consumed fragment
pub async fn initialize_with(
    provider: &dyn IdentityProvider,
    fragment: Option<LoginFragment>,
) -> InitOutcome {
    let mut notice = fragment.as_ref().and_then(|f| f.status.notice());

    if let Some(f) = &fragment {
        if let Some(token) = f.redeemable_token() {
            match provider.sign_in_with_custom_token(token).await {
                Ok(mut user) => {
                    // Profile hints from the login service fill the provider profile
                    if user.display_name.is_none() {
                        user.display_name = f.discord_username.clone();
                    }
                    if user.photo_url.is_none() {
                        user.photo_url = f.discord_pfp.clone();
                    }
                    info!("Signed in with custom token as {}", user.uid);
                    return InitOutcome { user: Some(user), notice };
                }
                Err(e) => {
                    warn!("Custom token sign-in failed, falling back to anonymous: {}", e);
                    notice = Some("Login could not be completed. Browsing anonymously.".to_string());
                }
            }
        } else if f.status == LoginStatus::Success {
            warn!("Login fragment reported success without a token");
            notice = Some("Login could not be completed. Browsing anonymously.".to_string());
        }
    }

    match provider.sign_in_anonymously().await {
        Ok(user) => {
            info!("Signed in anonymously as {}", user.uid);
            InitOutcome { user: Some(user), notice }
        }
        Err(e) => {
            warn!("Anonymous sign-in failed: {}", e);
            InitOutcome { user: None, notice }
        }
    }
}
