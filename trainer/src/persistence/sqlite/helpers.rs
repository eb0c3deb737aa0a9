//! Shared encode/decode helpers for SQLite ↔ domain type conversions.

use chess::Side;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::persistence::{Mistake, OpeningRecord};

/// Encode a side to the string used in the `openings.side` CHECK.
pub fn encode_side(side: Side) -> &'static str {
    side.as_str()
}

/// Decode a side column.
pub fn decode_side(s: &str) -> Side {
    match s.parse() {
        Ok(side) => side,
        Err(_) => {
            tracing::warn!("Unknown side '{}' in database, assuming white", s);
            Side::White // safe fallback
        }
    }
}

pub fn opening_from_row(row: &SqliteRow) -> OpeningRecord {
    OpeningRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        pgn_path: row.get("pgn_path"),
        side: decode_side(&row.get::<String, _>("side")),
        created_at: row.get::<i64, _>("created_at") as u64,
    }
}

pub fn mistake_from_row(row: &SqliteRow) -> Mistake {
    Mistake {
        id: row.get("id"),
        fen: row.get("fen"),
        correct_move_uci: row.get("correct_move_uci"),
        user_id: row.get("user_id"),
        opening_id: row.get("opening_id"),
        miss_count: row.get::<i64, _>("miss_count") as u32,
        last_missed_at: row.get::<i64, _>("last_missed_at") as u64,
    }
}
