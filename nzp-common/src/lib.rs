//! # NZ Packs Common Library
//!
//! Shared code for the NZ Packs catalog site including:
//! - Scenepack entry models
//! - Name/genre normalization and the page filter engine
//! - Session/role gate and the login fragment initializer
//! - Mutation gateway with ownership checks
//! - View controller and the live-query event bus
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod identity;
pub mod images;
pub mod login;
pub mod models;
pub mod mutation;
pub mod normalize;
pub mod session;
pub mod sse;
pub mod store;
pub mod view;

pub use error::{Error, Result};
pub use models::{EntryDraft, EntryFields, EntryType, ScenepackEntry};
pub use normalize::normalize;
