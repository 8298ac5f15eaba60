//! Catalog store collaborator
//!
//! A document collection with add / update-by-id / delete-by-id and a live
//! query that redelivers the full document list on every change. Consumers
//! always replace their snapshot wholesale; there is no incremental patch.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::models::{EntryFields, ScenepackEntry};
use crate::{Error, Result};

/// Logical path of the scenepack collection for an app id
pub fn collection_path(app_id: &str) -> String {
    format!("artifacts/{}/public/data/scenepacks", app_id)
}

/// One delivery on the live-query channel
#[derive(Debug, Clone)]
pub enum CatalogUpdate {
    /// Subscription open, nothing delivered yet
    Pending,
    /// Full current document list
    Snapshot(Arc<Vec<ScenepackEntry>>),
    /// Connectivity or read failure
    Error(String),
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Add a document; the store assigns and returns its id
    async fn add(&self, fields: &EntryFields, creator_id: &str) -> Result<String>;

    /// Merge the field set into an existing document
    async fn update(&self, id: &str, fields: &EntryFields) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Live query over the whole collection
    ///
    /// The receiver always holds the latest delivery; intermediate snapshots
    /// may be skipped by a slow consumer since each one is complete.
    fn subscribe(&self) -> watch::Receiver<CatalogUpdate>;
}

/// In-process store used for tests and local development
pub struct MemoryCatalogStore {
    docs: Mutex<Vec<ScenepackEntry>>,
    tx: watch::Sender<CatalogUpdate>,
}

impl Default for MemoryCatalogStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryCatalogStore {
    pub fn new(docs: Vec<ScenepackEntry>) -> Self {
        let (tx, _) = watch::channel(CatalogUpdate::Snapshot(Arc::new(docs.clone())));
        Self {
            docs: Mutex::new(docs),
            tx,
        }
    }

    /// Push a connectivity error onto the live channel
    pub fn fail_live_query(&self, message: &str) {
        self.tx.send_replace(CatalogUpdate::Error(message.to_string()));
    }

    fn publish(&self, docs: &[ScenepackEntry]) {
        self.tx
            .send_replace(CatalogUpdate::Snapshot(Arc::new(docs.to_vec())));
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<ScenepackEntry>>> {
        self.docs
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn add(&self, fields: &EntryFields, creator_id: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut docs = self.lock()?;
        docs.push(fields.clone().into_entry(id.clone(), creator_id.to_string()));
        self.publish(&docs);
        Ok(id)
    }

    async fn update(&self, id: &str, fields: &EntryFields) -> Result<()> {
        let mut docs = self.lock()?;
        let doc = docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::NotFound(format!("scenepack {}", id)))?;
        fields.apply_to(doc);
        self.publish(&docs);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut docs = self.lock()?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            return Err(Error::NotFound(format!("scenepack {}", id)));
        }
        self.publish(&docs);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<CatalogUpdate> {
        self.tx.subscribe()
    }
}
