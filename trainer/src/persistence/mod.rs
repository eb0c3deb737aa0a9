//! Storage for users, openings, mistakes and drill progress.
//!
//! Relational data lives in SQLite behind the repository traits in
//! [`traits`]; the per-user drill cursor is a single JSON document managed
//! by [`JsonDocument`].

mod json_store;
mod records;
pub mod sqlite;
pub mod traits;

pub use json_store::JsonDocument;
pub use records::{Mistake, MistakeKey, NewOpening, OpeningRecord, UserRecord, UserSettings};
pub use traits::{MistakeRepository, OpeningRepository, UserRepository};

use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Opening already exists: {name} ({side})")]
    DuplicateOpening { name: String, side: chess::Side },
    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Get the current unix timestamp in seconds.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
