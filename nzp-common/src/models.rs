//! Catalog entry models
//!
//! Field names serialize in camelCase to match the document store
//! (`imageUrl`, `creatorId`) and the browser UI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Scenepack category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Movie,
    Game,
    Tvshow,
    Anime,
}

impl EntryType {
    /// Value stored in the `type` field
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Movie => "movie",
            EntryType::Game => "game",
            EntryType::Tvshow => "tvshow",
            EntryType::Anime => "anime",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Ok(EntryType::Movie),
            "game" => Ok(EntryType::Game),
            "tvshow" => Ok(EntryType::Tvshow),
            "anime" => Ok(EntryType::Anime),
            other => Err(Error::InvalidInput(format!("Unknown scenepack type: {}", other))),
        }
    }
}

/// A cataloged scenepack as delivered by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenepackEntry {
    /// Store-assigned identifier
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default)]
    pub genre: Option<String>,
    pub url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Identity that created the entry; never changes after creation
    pub creator_id: String,
}

/// Validated field set passed to the store on create and update
///
/// Carries everything except `id` and `creator_id`, which the store and the
/// mutation gateway own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFields {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub genre: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
}

impl EntryFields {
    /// Build the stored entry for a freshly assigned id
    pub fn into_entry(self, id: String, creator_id: String) -> ScenepackEntry {
        ScenepackEntry {
            id,
            name: self.name,
            entry_type: self.entry_type,
            genre: self.genre,
            url: self.url,
            image_url: self.image_url,
            creator_id,
        }
    }

    /// Overwrite the mutable fields of an existing entry
    pub fn apply_to(&self, entry: &mut ScenepackEntry) {
        entry.name = self.name.clone();
        entry.entry_type = self.entry_type;
        entry.genre = self.genre.clone();
        entry.url = self.url.clone();
        entry.image_url = self.image_url.clone();
    }
}

/// Raw dashboard form submission
///
/// Every field is optional on the wire so that a missing field produces a
/// readable validation message instead of a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub entry_type: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl EntryDraft {
    /// Check required-field presence (name, type, url)
    pub fn validate(self) -> Result<EntryFields> {
        let name = required(self.name, "name")?;
        let entry_type: EntryType = required(self.entry_type, "type")?.parse()?;
        let url = required(self.url, "url")?;

        Ok(EntryFields {
            name,
            entry_type,
            genre: optional(self.genre),
            url,
            image_url: optional(self.image_url),
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    optional(value).ok_or_else(|| Error::InvalidInput(format!("Missing required field: {}", field)))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
