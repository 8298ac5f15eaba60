//! Database access layer for nzp-site
//!
//! SQLite backs the scenepack collection locally. The schema mirrors the
//! document fields one column each, plus the logical collection path so one
//! database file can hold several app ids.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

mod store;
pub use store::SqliteCatalogStore;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS scenepacks (
    id TEXT PRIMARY KEY,
    collection TEXT NOT NULL,
    name TEXT NOT NULL,
    entry_type TEXT NOT NULL,
    genre TEXT,
    url TEXT NOT NULL,
    image_url TEXT,
    creator_id TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_scenepacks_collection ON scenepacks(collection);
"#;

/// Open (creating if needed) the database file
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
        .context("Invalid database path")?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Private in-memory database; one connection so every query sees the same data
pub async fn connect_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .context("Failed to open in-memory database")?;

    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .context("Failed to create schema")?;
    Ok(())
}
