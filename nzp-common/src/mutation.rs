//! Mutation gateway
//!
//! Thin create/update/delete pass-through to the catalog store. The only
//! local checks are store readiness and record ownership; the latter is
//! advisory, the store's own rules remain the real authorization boundary.

use std::sync::Arc;

use tracing::{error, info};

use crate::models::{EntryFields, ScenepackEntry};
use crate::session::AuthSession;
use crate::store::CatalogStore;
use crate::{Error, Result};

/// Reject unless `actor` created `entry`
pub fn ensure_owner(actor: &AuthSession, entry: &ScenepackEntry) -> Result<()> {
    if entry.creator_id == actor.id {
        Ok(())
    } else {
        Err(Error::Ownership {
            entry_id: entry.id.clone(),
        })
    }
}

pub struct MutationGateway {
    store: Option<Arc<dyn CatalogStore>>,
}

impl MutationGateway {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Gateway with no store attached; every call fails with `StoreUnavailable`
    pub fn detached() -> Self {
        Self { store: None }
    }

    fn store(&self) -> Result<&Arc<dyn CatalogStore>> {
        self.store.as_ref().ok_or(Error::StoreUnavailable)
    }

    /// Create an entry owned by `actor`; returns the store-assigned id
    pub async fn create(&self, actor: &AuthSession, fields: &EntryFields) -> Result<String> {
        let store = self.store()?;
        match store.add(fields, &actor.id).await {
            Ok(id) => {
                info!("Created scenepack {} ({}) for {}", id, fields.name, actor.id);
                Ok(id)
            }
            Err(e) => {
                error!("Create failed for {}: {}", actor.id, e);
                Err(e)
            }
        }
    }

    pub async fn update(
        &self,
        actor: &AuthSession,
        existing: &ScenepackEntry,
        fields: &EntryFields,
    ) -> Result<()> {
        ensure_owner(actor, existing)?;
        let store = self.store()?;
        store.update(&existing.id, fields).await.map_err(|e| {
            error!("Update of {} failed: {}", existing.id, e);
            e
        })?;
        info!("Updated scenepack {}", existing.id);
        Ok(())
    }

    pub async fn delete(&self, actor: &AuthSession, existing: &ScenepackEntry) -> Result<()> {
        ensure_owner(actor, existing)?;
        let store = self.store()?;
        store.delete(&existing.id).await.map_err(|e| {
            error!("Delete of {} failed: {}", existing.id, e);
            e
        })?;
        info!("Deleted scenepack {}", existing.id);
        Ok(())
    }
}
