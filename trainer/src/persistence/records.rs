use chess::Side;

/// A trainee and their timing preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub lichess_username: Option<String>,
    pub training_delay_ms: u64,
    pub error_display_delay_ms: u64,
}

impl UserRecord {
    pub fn settings(&self) -> UserSettings {
        UserSettings {
            lichess_username: self.lichess_username.clone(),
            training_delay_ms: self.training_delay_ms,
            error_display_delay_ms: self.error_display_delay_ms,
        }
    }
}

/// The editable part of a [`UserRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSettings {
    pub lichess_username: Option<String>,
    pub training_delay_ms: u64,
    pub error_display_delay_ms: u64,
}

/// A stored repertoire entry. The move tree itself stays in the PGN file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningRecord {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub pgn_path: String,
    pub side: Side,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOpening {
    pub user_id: i64,
    pub name: String,
    pub pgn_path: String,
    pub side: Side,
}

/// A position the user got wrong, with the move they should have played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mistake {
    pub id: i64,
    pub fen: String,
    /// Standard UCI (castling as the two-square king step).
    pub correct_move_uci: String,
    pub user_id: i64,
    pub opening_id: Option<i64>,
    pub miss_count: u32,
    pub last_missed_at: u64,
}

/// Identity of a mistake row: one row per position, user and opening.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MistakeKey {
    pub fen: String,
    pub user_id: i64,
    pub opening_id: Option<i64>,
}
