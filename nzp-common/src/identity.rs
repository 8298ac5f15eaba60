//! Identity provider collaborator
//!
//! The provider owns sign-in and token issuance. This crate only consumes
//! the signed-in user it reports and the claims attached to that user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Signed-in user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    pub uid: String,
    /// Provider-native profile name
    pub display_name: Option<String>,
    /// Provider-native profile picture
    pub photo_url: Option<String>,
    pub is_anonymous: bool,
    /// Provider ID token carrying developer claims
    #[serde(skip_serializing)]
    pub id_token: Option<String>,
}

/// Claims minted by the login service into the custom token
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdentityClaims {
    #[serde(default)]
    pub discord_username: Option<String>,
    #[serde(default)]
    pub discord_pfp: Option<String>,
    /// Role grant: the user holds the required Discord guild role
    #[serde(default)]
    pub has_role: bool,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in with a custom token handed over by the login service
    async fn sign_in_with_custom_token(&self, token: &str) -> Result<ProviderUser>;

    /// Open an anonymous session
    async fn sign_in_anonymously(&self) -> Result<ProviderUser>;

    /// Fetch the identity claims for a signed-in user
    async fn fetch_claims(&self, user: &ProviderUser) -> Result<IdentityClaims>;
}
