//! SQLite-backed repository for missed positions.

use sqlx::SqlitePool;

use super::helpers::mistake_from_row;
use crate::persistence::traits::MistakeRepository;
use crate::persistence::{Mistake, MistakeKey, PersistenceError};

const SELECT_MISTAKE: &str = r#"
    SELECT id, fen, correct_move_uci, user_id, opening_id, miss_count, last_missed_at
    FROM mistakes
"#;

/// SQLite implementation of [`MistakeRepository`].
pub struct SqliteMistakeRepository {
    pool: SqlitePool,
}

impl SqliteMistakeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl MistakeRepository for SqliteMistakeRepository {
    async fn upsert_mistake(
        &self,
        key: &MistakeKey,
        correct_move_uci: &str,
        missed_at: u64,
    ) -> Result<Mistake, PersistenceError> {
        let mut tx = self.pool.begin().await?;

        // `IS` so that a NULL opening matches NULL
        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM mistakes WHERE fen = ? AND user_id = ? AND opening_id IS ?",
        )
        .bind(&key.fen)
        .bind(key.user_id)
        .bind(key.opening_id)
        .fetch_optional(&mut *tx)
        .await?;

        let id = match existing {
            Some((id,)) => {
                sqlx::query(
                    r#"
                    UPDATE mistakes
                    SET miss_count = miss_count + 1, last_missed_at = ?, correct_move_uci = ?
                    WHERE id = ?
                    "#,
                )
                .bind(missed_at as i64)
                .bind(correct_move_uci)
                .bind(id)
                .execute(&mut *tx)
                .await?;
                id
            }
            None => sqlx::query(
                r#"
                INSERT INTO mistakes
                    (fen, correct_move_uci, user_id, opening_id, miss_count, last_missed_at)
                VALUES (?, ?, ?, ?, 1, ?)
                "#,
            )
            .bind(&key.fen)
            .bind(correct_move_uci)
            .bind(key.user_id)
            .bind(key.opening_id)
            .bind(missed_at as i64)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid(),
        };

        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_MISTAKE))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(mistake_from_row(&row))
    }

    async fn list_mistakes(&self, user_id: i64) -> Result<Vec<Mistake>, PersistenceError> {
        let rows = sqlx::query(&format!(
            "{} WHERE user_id = ? ORDER BY miss_count DESC, last_missed_at DESC",
            SELECT_MISTAKE
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(mistake_from_row).collect())
    }

    async fn mistakes_since(&self, user_id: i64, since: u64) -> Result<Vec<Mistake>, PersistenceError> {
        let rows = sqlx::query(&format!(
            "{} WHERE user_id = ? AND last_missed_at >= ? ORDER BY miss_count DESC, last_missed_at DESC",
            SELECT_MISTAKE
        ))
        .bind(user_id)
        .bind(since as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(mistake_from_row).collect())
    }

    async fn delete_mistake(&self, id: i64) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM mistakes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
