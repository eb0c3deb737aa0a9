//! Configuration for the opening trainer
//!
//! Handles data directory configuration with the following precedence:
//! 1. OPENING_TRAINER_DATA_DIR environment variable
//! 2. ~/.config/opening-trainer/data (production default)
//! 3. ./data (fallback for development)

use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_DIR: &str = ".config/opening-trainer/data";
const DEV_DATA_DIR: &str = "./data";

const DATABASE_FILE: &str = "trainer_data.db";
const PROGRESS_FILE: &str = "user_data/progress.json";
const LOG_DIR: &str = "logs";

/// Pause before the computer plays the opponent's reply.
pub const DEFAULT_OPPONENT_DELAY_MS: u64 = 500;

/// How long a wrong move stays on the board before the line continues.
pub const DEFAULT_ERROR_DISPLAY_DELAY_MS: u64 = 1000;

/// How long review feedback is shown before the next position.
pub const REVIEW_FEEDBACK_DELAY_MS: u64 = 1500;

/// Most games taken from an archive in one analysis batch.
pub const MAX_ARCHIVE_GAMES: usize = 50;

/// Get the data directory for persistence.
///
/// Priority:
/// 1. OPENING_TRAINER_DATA_DIR env variable if set
/// 2. $HOME/.config/opening-trainer/data if HOME is set
/// 3. ./data as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("OPENING_TRAINER_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// SQLite database inside `data_dir`.
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

/// Line progress document inside `data_dir`.
pub fn progress_path(data_dir: &Path) -> PathBuf {
    data_dir.join(PROGRESS_FILE)
}

pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_data_dir_fallback() {
        // Returns the env override when OPENING_TRAINER_DATA_DIR is set
        let dir = get_data_dir();
        match std::env::var("OPENING_TRAINER_DATA_DIR") {
            Ok(val) => assert_eq!(dir, PathBuf::from(val)),
            Err(_) => assert!(!dir.as_os_str().is_empty()),
        }
    }

    #[test]
    fn test_paths_inside_data_dir() {
        let dir = Path::new("/tmp/trainer");
        assert_eq!(database_path(dir), PathBuf::from("/tmp/trainer/trainer_data.db"));
        assert_eq!(
            progress_path(dir),
            PathBuf::from("/tmp/trainer/user_data/progress.json")
        );
        assert_eq!(log_dir(dir), PathBuf::from("/tmp/trainer/logs"));
    }
}
