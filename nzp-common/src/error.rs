//! Common error types for NZ Packs

use thiserror::Error;

/// Common result type for NZ Packs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the catalog core and the site
#[derive(Error, Debug)]
pub enum Error {
    /// Store or identity provider misconfigured; fatal at startup
    #[error("Initialization error: {0}")]
    Init(String),

    /// Custom-token or anonymous sign-in rejected by the identity provider
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Identity claims could not be fetched or decoded
    #[error("Claims error: {0}")]
    Claims(String),

    /// Store rejected a read or write
    #[error("Store error: {0}")]
    Store(String),

    /// No store attached yet
    #[error("Catalog store is not initialized")]
    StoreUnavailable,

    /// Acting identity does not own the record
    #[error("Ownership error: entry {entry_id} belongs to another creator")]
    Ownership { entry_id: String },

    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
