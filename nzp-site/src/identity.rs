//! Identity provider client
//!
//! Talks to the hosted identity REST API. Custom-token and anonymous sign-in
//! both return an ID token; developer claims minted by the login service
//! (`discord_username`, `discord_pfp`, `has_role`) ride in its payload.
//!
//! The payload is decoded without signature verification. The token came
//! straight from the provider over TLS, and the store enforces its own rules.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use nzp_common::identity::{IdentityClaims, IdentityProvider, ProviderUser};
use nzp_common::{Error, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    /// Only present on anonymous sign-up
    #[serde(default)]
    local_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Subset of the ID token payload
#[derive(Debug, Deserialize)]
struct TokenPayload {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    firebase: Option<FirebaseSection>,
    #[serde(flatten)]
    claims: IdentityClaims,
}

#[derive(Debug, Deserialize)]
struct FirebaseSection {
    #[serde(default)]
    sign_in_provider: Option<String>,
}

pub struct HttpIdentityProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| Error::Init(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    async fn sign_in(&self, method: &str, body: serde_json::Value) -> Result<SignInResponse> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        debug!("Identity request: {}", method);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .map(|env| env.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(Error::Auth(format!("{} rejected: {}", method, message)));
        }

        response
            .json::<SignInResponse>()
            .await
            .map_err(|e| Error::Auth(format!("{} returned malformed body: {}", method, e)))
    }
}

/// Decode the payload segment of a JWT
fn decode_payload(id_token: &str) -> Result<TokenPayload> {
    let segment = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| Error::Claims("ID token is not a JWT".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| Error::Claims(format!("ID token payload is not base64url: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Claims(format!("ID token payload is not valid JSON: {}", e)))
}

fn user_from_token(id_token: String, local_id: Option<String>) -> Result<ProviderUser> {
    let payload = decode_payload(&id_token).map_err(|e| Error::Auth(e.to_string()))?;
    let is_anonymous = payload
        .firebase
        .and_then(|f| f.sign_in_provider)
        .map(|p| p == "anonymous")
        .unwrap_or(false);

    Ok(ProviderUser {
        uid: local_id.unwrap_or(payload.sub),
        display_name: payload.name,
        photo_url: payload.picture,
        is_anonymous,
        id_token: Some(id_token),
    })
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in_with_custom_token(&self, token: &str) -> Result<ProviderUser> {
        let resp = self
            .sign_in(
                "signInWithCustomToken",
                json!({ "token": token, "returnSecureToken": true }),
            )
            .await?;
        user_from_token(resp.id_token, resp.local_id)
    }

    async fn sign_in_anonymously(&self) -> Result<ProviderUser> {
        let resp = self
            .sign_in("signUp", json!({ "returnSecureToken": true }))
            .await?;
        let mut user = user_from_token(resp.id_token, resp.local_id)?;
        user.is_anonymous = true;
        Ok(user)
    }

    async fn fetch_claims(&self, user: &ProviderUser) -> Result<IdentityClaims> {
        let token = user
            .id_token
            .as_deref()
            .ok_or_else(|| Error::Claims(format!("No ID token for {}", user.uid)))?;
        Ok(decode_payload(token)?.claims)
    }
}
