//! SQLite-backed scenepack collection
//!
//! Every successful write re-reads the whole collection and publishes it on
//! the live-query channel, matching the full-redelivery semantics of the
//! hosted document store. Reload and publish run under one lock so a
//! slower reload never overwrites a newer snapshot.

use std::sync::Arc;

use async_trait::async_trait;
use nzp_common::store::{collection_path, CatalogStore, CatalogUpdate};
use nzp_common::{EntryFields, EntryType, Error, Result, ScenepackEntry};
use sqlx::{Row, SqlitePool};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, warn};
use uuid::Uuid;

pub struct SqliteCatalogStore {
    pool: SqlitePool,
    collection: String,
    tx: watch::Sender<CatalogUpdate>,
    publish_lock: Mutex<()>,
}

impl SqliteCatalogStore {
    /// Attach to the collection of `app_id` and publish its current contents
    pub async fn open(pool: SqlitePool, app_id: &str) -> Result<Self> {
        let (tx, _) = watch::channel(CatalogUpdate::Pending);
        let store = Self {
            pool,
            collection: collection_path(app_id),
            tx,
            publish_lock: Mutex::new(()),
        };

        let docs = store.load_all().await?;
        debug!("Opened {} with {} documents", store.collection, docs.len());
        store.tx.send_replace(CatalogUpdate::Snapshot(Arc::new(docs)));
        Ok(store)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Read every document of the collection in insertion order
    pub async fn load_all(&self) -> Result<Vec<ScenepackEntry>> {
        let rows = sqlx::query(
            "SELECT id, name, entry_type, genre, url, image_url, creator_id
             FROM scenepacks
             WHERE collection = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get(0);
            let raw_type: String = row.get(2);
            let entry_type = match raw_type.parse::<EntryType>() {
                Ok(t) => t,
                Err(_) => {
                    warn!("Skipping document {} with unknown type {:?}", id, raw_type);
                    continue;
                }
            };

            docs.push(ScenepackEntry {
                id,
                name: row.get(1),
                entry_type,
                genre: row.get(3),
                url: row.get(4),
                image_url: row.get(5),
                creator_id: row.get(6),
            });
        }
        Ok(docs)
    }

    /// Publish the full collection, or the read error, to subscribers
    async fn publish(&self) {
        let _guard = self.publish_lock.lock().await;
        let update = match self.load_all().await {
            Ok(docs) => CatalogUpdate::Snapshot(Arc::new(docs)),
            Err(e) => {
                error!("Live query reload of {} failed: {}", self.collection, e);
                CatalogUpdate::Error(e.to_string())
            }
        };
        self.tx.send_replace(update);
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn add(&self, fields: &EntryFields, creator_id: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO scenepacks (id, collection, name, entry_type, genre, url, image_url, creator_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&self.collection)
        .bind(&fields.name)
        .bind(fields.entry_type.as_str())
        .bind(&fields.genre)
        .bind(&fields.url)
        .bind(&fields.image_url)
        .bind(creator_id)
        .execute(&self.pool)
        .await?;

        self.publish().await;
        Ok(id)
    }

    async fn update(&self, id: &str, fields: &EntryFields) -> Result<()> {
        let result = sqlx::query(
            "UPDATE scenepacks
             SET name = ?, entry_type = ?, genre = ?, url = ?, image_url = ?
             WHERE id = ? AND collection = ?",
        )
        .bind(&fields.name)
        .bind(fields.entry_type.as_str())
        .bind(&fields.genre)
        .bind(&fields.url)
        .bind(&fields.image_url)
        .bind(id)
        .bind(&self.collection)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("scenepack {}", id)));
        }
        self.publish().await;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM scenepacks WHERE id = ? AND collection = ?")
            .bind(id)
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("scenepack {}", id)));
        }
        self.publish().await;
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<CatalogUpdate> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;

    fn fields(name: &str, t: EntryType) -> EntryFields {
        EntryFields {
            name: name.to_string(),
            entry_type: t,
            genre: Some("Action".to_string()),
            url: format!("https://example.com/{}", name),
            image_url: None,
        }
    }

    fn docs(rx: &watch::Receiver<CatalogUpdate>) -> Arc<Vec<ScenepackEntry>> {
        match &*rx.borrow() {
            CatalogUpdate::Snapshot(docs) => docs.clone(),
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_publishes_initial_snapshot() {
        let pool = connect_memory().await.unwrap();
        let store = SqliteCatalogStore::open(pool, "nzpacks").await.unwrap();
        assert_eq!(store.collection(), "artifacts/nzpacks/public/data/scenepacks");
        assert!(docs(&store.subscribe()).is_empty());
    }

    #[tokio::test]
    async fn test_writes_redeliver_full_collection() {
        let pool = connect_memory().await.unwrap();
        let store = SqliteCatalogStore::open(pool, "nzpacks").await.unwrap();
        let mut rx = store.subscribe();

        let heat = store.add(&fields("Heat", EntryType::Movie), "u1").await.unwrap();
        rx.changed().await.unwrap();
        store.add(&fields("Halo", EntryType::Game), "u2").await.unwrap();
        rx.changed().await.unwrap();

        let all = docs(&rx);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, heat);
        assert_eq!(all[0].creator_id, "u1");
        assert_eq!(all[1].entry_type, EntryType::Game);

        let mut renamed = fields("Heat (1995)", EntryType::Movie);
        renamed.genre = None;
        store.update(&heat, &renamed).await.unwrap();
        rx.changed().await.unwrap();
        let all = docs(&rx);
        assert_eq!(all[0].name, "Heat (1995)");
        assert_eq!(all[0].genre, None);
        assert_eq!(all[0].creator_id, "u1");

        store.delete(&heat).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(docs(&rx).len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_publish_latest_collection() {
        let pool = connect_memory().await.unwrap();
        let store = Arc::new(SqliteCatalogStore::open(pool, "nzpacks").await.unwrap());
        let rx = store.subscribe();

        let writers: Vec<_> = (0..8)
            .map(|w| {
                let store = store.clone();
                tokio::spawn(async move {
                    for i in 0..5 {
                        let name = format!("Pack {}-{}", w, i);
                        store.add(&fields(&name, EntryType::Movie), "u1").await.unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let published = docs(&rx);
        assert_eq!(published.len(), 40);
        assert_eq!(*published, store.load_all().await.unwrap());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let pool = connect_memory().await.unwrap();
        let prod = SqliteCatalogStore::open(pool.clone(), "nzpacks").await.unwrap();
        let staging = SqliteCatalogStore::open(pool, "staging").await.unwrap();

        let id = prod.add(&fields("Heat", EntryType::Movie), "u1").await.unwrap();
        assert!(staging.load_all().await.unwrap().is_empty());
        assert!(matches!(staging.delete(&id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let pool = connect_memory().await.unwrap();
        let store = SqliteCatalogStore::open(pool, "nzpacks").await.unwrap();
        let err = store
            .update("missing", &fields("x", EntryType::Anime))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
