//! SQLite-backed repository implementations.
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with WAL mode and
//! foreign keys, and runs the embedded migrations from `migrations/` when
//! opened. The schema is idempotent.
//!
//! | Type | Trait |
//! |------|-------|
//! | [`SqliteUserRepository`] | `UserRepository` |
//! | [`SqliteOpeningRepository`] | `OpeningRepository` |
//! | [`SqliteMistakeRepository`] | `MistakeRepository` |
//!
//! Sides are stored as lowercase `TEXT` and round-tripped through
//! [`helpers`].

mod database;
mod mistake_repo;
mod opening_repo;
mod user_repo;
pub(crate) mod helpers;

pub use database::Database;
pub use mistake_repo::SqliteMistakeRepository;
pub use opening_repo::SqliteOpeningRepository;
pub use user_repo::{SqliteUserRepository, DEFAULT_USERNAME};
