//! SQLite-backed repository for users and their settings.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::persistence::traits::UserRepository;
use crate::persistence::{PersistenceError, UserRecord, UserSettings};

/// Name of the implicit single user of a local installation.
pub const DEFAULT_USERNAME: &str = "default_user";

/// SQLite implementation of [`UserRepository`].
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &SqliteRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        lichess_username: row.get("lichess_username"),
        training_delay_ms: row.get::<i64, _>("training_delay_ms") as u64,
        error_display_delay_ms: row.get::<i64, _>("error_display_delay_ms") as u64,
    }
}

impl UserRepository for SqliteUserRepository {
    async fn get_or_create_user(&self, username: &str) -> Result<UserRecord, PersistenceError> {
        sqlx::query("INSERT OR IGNORE INTO users (username) VALUES (?)")
            .bind(username)
            .execute(&self.pool)
            .await?;

        self.load_user(username)
            .await?
            .ok_or_else(|| PersistenceError::NotFound(format!("user {}", username)))
    }

    async fn load_user(&self, username: &str) -> Result<Option<UserRecord>, PersistenceError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, lichess_username, training_delay_ms, error_display_delay_ms
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn save_settings(
        &self,
        user_id: i64,
        settings: &UserSettings,
    ) -> Result<(), PersistenceError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET lichess_username = ?, training_delay_ms = ?, error_display_delay_ms = ?
            WHERE id = ?
            "#,
        )
        .bind(&settings.lichess_username)
        .bind(settings.training_delay_ms as i64)
        .bind(settings.error_display_delay_ms as i64)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(format!("user id {}", user_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::Database;

    async fn test_db() -> (Database, SqliteUserRepository) {
        let db = Database::new_in_memory().await.unwrap();
        let repo = SqliteUserRepository::new(db.pool().clone());
        (db, repo)
    }

    #[tokio::test]
    async fn test_get_or_create_uses_defaults() {
        let (_db, repo) = test_db().await;
        let user = repo.get_or_create_user(DEFAULT_USERNAME).await.unwrap();
        assert_eq!(user.username, DEFAULT_USERNAME);
        assert_eq!(user.training_delay_ms, 500);
        assert_eq!(user.error_display_delay_ms, 1000);
        assert_eq!(user.lichess_username, None);
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let (_db, repo) = test_db().await;
        let first = repo.get_or_create_user("alice").await.unwrap();
        let second = repo.get_or_create_user("alice").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (_db, repo) = test_db().await;
        assert_eq!(repo.load_user("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_settings() {
        let (_db, repo) = test_db().await;
        let user = repo.get_or_create_user("bob").await.unwrap();
        let settings = UserSettings {
            lichess_username: Some("bob_on_lichess".to_string()),
            training_delay_ms: 250,
            error_display_delay_ms: 2000,
        };
        repo.save_settings(user.id, &settings).await.unwrap();

        let loaded = repo.load_user("bob").await.unwrap().unwrap();
        assert_eq!(loaded.settings(), settings);
    }

    #[tokio::test]
    async fn test_save_settings_for_missing_user() {
        let (_db, repo) = test_db().await;
        let settings = UserSettings {
            lichess_username: None,
            training_delay_ms: 500,
            error_display_delay_ms: 1000,
        };
        assert!(matches!(
            repo.save_settings(42, &settings).await,
            Err(PersistenceError::NotFound(_))
        ));
    }
}
