//! SQLite-backed repository for repertoire entries.

use sqlx::SqlitePool;

use super::helpers::{encode_side, opening_from_row};
use crate::persistence::traits::OpeningRepository;
use crate::persistence::{now_timestamp, NewOpening, OpeningRecord, PersistenceError};

/// SQLite implementation of [`OpeningRepository`].
pub struct SqliteOpeningRepository {
    pool: SqlitePool,
}

impl SqliteOpeningRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl OpeningRepository for SqliteOpeningRepository {
    async fn insert_opening(&self, opening: &NewOpening) -> Result<OpeningRecord, PersistenceError> {
        let created_at = now_timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO openings (user_id, name, pgn_path, side, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(opening.user_id)
        .bind(&opening.name)
        .bind(&opening.pgn_path)
        .bind(encode_side(opening.side))
        .bind(created_at as i64)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(PersistenceError::DuplicateOpening {
                    name: opening.name.clone(),
                    side: opening.side,
                });
            }
            Err(e) => return Err(e.into()),
        };

        Ok(OpeningRecord {
            id: result.last_insert_rowid(),
            user_id: opening.user_id,
            name: opening.name.clone(),
            pgn_path: opening.pgn_path.clone(),
            side: opening.side,
            created_at,
        })
    }

    async fn list_openings(&self, user_id: i64) -> Result<Vec<OpeningRecord>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, pgn_path, side, created_at
            FROM openings
            WHERE user_id = ?
            ORDER BY name, side
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(opening_from_row).collect())
    }

    async fn delete_opening(&self, id: i64) -> Result<(), PersistenceError> {
        // Mistakes against this opening go with it (ON DELETE CASCADE).
        sqlx::query("DELETE FROM openings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::{Database, SqliteMistakeRepository, SqliteUserRepository};
    use crate::persistence::traits::{MistakeRepository, UserRepository};
    use crate::persistence::MistakeKey;
    use chess::Side;

    async fn test_db() -> (Database, SqliteOpeningRepository, i64) {
        let db = Database::new_in_memory().await.unwrap();
        let users = SqliteUserRepository::new(db.pool().clone());
        let user = users.get_or_create_user("tester").await.unwrap();
        let repo = SqliteOpeningRepository::new(db.pool().clone());
        (db, repo, user.id)
    }

    fn new_opening(user_id: i64, name: &str, side: Side) -> NewOpening {
        NewOpening {
            user_id,
            name: name.to_string(),
            pgn_path: format!("/tmp/{}.pgn", name),
            side,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let (_db, repo, user_id) = test_db().await;
        repo.insert_opening(&new_opening(user_id, "Sicilian", Side::Black))
            .await
            .unwrap();
        repo.insert_opening(&new_opening(user_id, "Italian", Side::White))
            .await
            .unwrap();

        let list = repo.list_openings(user_id).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "Italian");
        assert_eq!(list[0].side, Side::White);
        assert_eq!(list[1].name, "Sicilian");
        assert_eq!(list[1].side, Side::Black);
    }

    #[tokio::test]
    async fn test_duplicate_name_and_side_rejected() {
        let (_db, repo, user_id) = test_db().await;
        repo.insert_opening(&new_opening(user_id, "Italian", Side::White))
            .await
            .unwrap();
        let dup = repo
            .insert_opening(&new_opening(user_id, "Italian", Side::White))
            .await;
        assert!(matches!(dup, Err(PersistenceError::DuplicateOpening { .. })));

        // Same name for the other side is a different opening
        repo.insert_opening(&new_opening(user_id, "Italian", Side::Black))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_cascades_to_mistakes() {
        let (db, repo, user_id) = test_db().await;
        let opening = repo
            .insert_opening(&new_opening(user_id, "Italian", Side::White))
            .await
            .unwrap();

        let mistakes = SqliteMistakeRepository::new(db.pool().clone());
        let key = MistakeKey {
            fen: chess::STARTING_FEN.to_string(),
            user_id,
            opening_id: Some(opening.id),
        };
        mistakes.upsert_mistake(&key, "e2e4", 100).await.unwrap();

        repo.delete_opening(opening.id).await.unwrap();
        assert!(repo.list_openings(user_id).await.unwrap().is_empty());
        assert!(mistakes.list_mistakes(user_id).await.unwrap().is_empty());
    }
}
