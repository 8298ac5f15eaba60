//! Card image pre-fetch
//!
//! Every card probes its image independently with a fixed timeout. All probes
//! of one render run concurrently with no cap. A probe that fails or times out
//! falls back to the placeholder; image problems are never surfaced.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::models::ScenepackEntry;

pub const IMAGE_PROBE_TIMEOUT: Duration = Duration::from_secs(7);

pub const PLACEHOLDER_IMAGE_URL: &str = "https://placehold.co/600x400/1f2937/9ca3af?text=No+Image";

#[async_trait]
pub trait ImageProbe: Send + Sync {
    /// Whether `url` currently serves a loadable image
    async fn probe(&self, url: &str) -> bool;
}

/// Probe that accepts every URL without touching the network
pub struct TrustingProbe;

#[async_trait]
impl ImageProbe for TrustingProbe {
    async fn probe(&self, _url: &str) -> bool {
        true
    }
}

/// Entry plus the image URL a card should display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(flatten)]
    pub entry: ScenepackEntry,
    pub display_image_url: String,
}

/// Image URL to display for one card
pub async fn resolve_card_image(
    probe: &dyn ImageProbe,
    image_url: Option<&str>,
    timeout: Duration,
    placeholder: &str,
) -> String {
    let Some(url) = image_url.map(str::trim).filter(|u| !u.is_empty()) else {
        return placeholder.to_string();
    };

    match tokio::time::timeout(timeout, probe.probe(url)).await {
        Ok(true) => url.to_string(),
        Ok(false) => {
            debug!("Image failed to load, using placeholder: {}", url);
            placeholder.to_string()
        }
        Err(_) => {
            debug!("Image probe timed out after {:?}: {}", timeout, url);
            placeholder.to_string()
        }
    }
}

/// Resolve every card's image concurrently, preserving entry order
pub async fn resolve_cards(
    probe: &dyn ImageProbe,
    entries: Vec<ScenepackEntry>,
    timeout: Duration,
    placeholder: &str,
) -> Vec<Card> {
    let images = futures::future::join_all(
        entries
            .iter()
            .map(|e| resolve_card_image(probe, e.image_url.as_deref(), timeout, placeholder)),
    )
    .await;

    entries
        .into_iter()
        .zip(images)
        .map(|(entry, display_image_url)| Card {
            entry,
            display_image_url,
        })
        .collect()
}
