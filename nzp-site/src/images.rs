//! HTTP image probe
//!
//! A card image counts as loadable when a GET returns a success status and
//! an `image/*` content type. Redirects are followed.

use std::time::Duration;

use async_trait::async_trait;
use nzp_common::images::ImageProbe;
use nzp_common::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

pub struct HttpImageProbe {
    client: reqwest::Client,
}

impl HttpImageProbe {
    /// `timeout` bounds the client itself; callers apply their own as well
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nzp-site/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Init(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn is_image(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

#[async_trait]
impl ImageProbe for HttpImageProbe {
    async fn probe(&self, url: &str) -> bool {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("Image fetch failed for {}: {}", url, e);
                return false;
            }
        };

        if !response.status().is_success() {
            debug!("Image fetch for {} returned {}", url, response.status());
            return false;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        is_image(content_type)
    }
}
