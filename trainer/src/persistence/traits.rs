//! Async repository trait definitions for the persistence layer.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures can be driven from `tokio::spawn` and generic callers.

use super::{Mistake, MistakeKey, NewOpening, OpeningRecord, PersistenceError, UserRecord, UserSettings};
use std::future::Future;

/// Repository for trainees and their settings.
pub trait UserRepository: Send + Sync {
    /// Return the user named `username`, creating it with default settings
    /// on first use.
    fn get_or_create_user(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<UserRecord, PersistenceError>> + Send;
    fn load_user(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, PersistenceError>> + Send;
    fn save_settings(
        &self,
        user_id: i64,
        settings: &UserSettings,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Repository for repertoire entries.
///
/// `(user_id, name, side)` is unique; inserting a duplicate fails with
/// [`PersistenceError::DuplicateOpening`]. Deleting an opening removes the
/// mistakes recorded against it.
pub trait OpeningRepository: Send + Sync {
    fn insert_opening(
        &self,
        opening: &NewOpening,
    ) -> impl Future<Output = Result<OpeningRecord, PersistenceError>> + Send;
    fn list_openings(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<OpeningRecord>, PersistenceError>> + Send;
    fn delete_opening(&self, id: i64) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Repository for missed positions.
///
/// Rows are keyed by [`MistakeKey`]. Upserting an existing key increments
/// its miss count and refreshes `last_missed_at`; a new key starts at one.
pub trait MistakeRepository: Send + Sync {
    fn upsert_mistake(
        &self,
        key: &MistakeKey,
        correct_move_uci: &str,
        missed_at: u64,
    ) -> impl Future<Output = Result<Mistake, PersistenceError>> + Send;
    /// All mistakes of a user, most-missed first.
    fn list_mistakes(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<Mistake>, PersistenceError>> + Send;
    /// Mistakes last missed at or after `since`, most-missed first.
    fn mistakes_since(
        &self,
        user_id: i64,
        since: u64,
    ) -> impl Future<Output = Result<Vec<Mistake>, PersistenceError>> + Send;
    fn delete_mistake(&self, id: i64) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}
