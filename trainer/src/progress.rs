//! Durable drill cursor: which line of which opening the user is on.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::persistence::{JsonDocument, PersistenceError};

/// On-disk progress document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressRecord {
    pub opening_id: String,
    /// Permutation of line indices; lines are drilled in this order.
    pub line_order: Vec<usize>,
    /// Position within `line_order`.
    pub current_line_pointer: usize,
    pub ply_index: usize,
    pub mistakes: Vec<ProgressMistake>,
}

/// A ply the user got wrong while learning a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMistake {
    #[serde(rename = "linePtr")]
    pub line_ptr: usize,
    pub ply: usize,
    /// Expected move in UCI.
    #[serde(rename = "move")]
    pub mv: String,
}

impl ProgressRecord {
    /// Index of the line under the cursor, if any remain.
    pub fn current_line(&self) -> Option<usize> {
        self.line_order.get(self.current_line_pointer).copied()
    }

    pub fn is_finished(&self) -> bool {
        self.current_line_pointer >= self.line_order.len()
    }

    /// Plies recorded as mistakes for the line at `line_ptr`.
    pub fn mistake_plies(&self, line_ptr: usize) -> Vec<usize> {
        self.mistakes
            .iter()
            .filter(|m| m.line_ptr == line_ptr)
            .map(|m| m.ply)
            .collect()
    }

    fn is_permutation_of(&self, line_count: usize) -> bool {
        if self.line_order.len() != line_count {
            return false;
        }
        let mut seen = vec![false; line_count];
        for &index in &self.line_order {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        true
    }
}

/// Exclusive owner of the [`ProgressRecord`], writing it through to disk
/// after every mutation.
///
/// The in-memory record is updated before the write, so a failed save
/// leaves the session usable and is reported to the caller.
pub struct ProgressStore {
    document: JsonDocument<ProgressRecord>,
    record: ProgressRecord,
}

impl ProgressStore {
    /// Open the progress file at `path`. A missing or corrupt file yields a
    /// blank record, which is written back immediately.
    pub fn open(path: PathBuf) -> Self {
        let document = JsonDocument::new(path);
        let exists = document.path().exists();
        let record = document.load_or_default();
        let store = Self { document, record };
        if !exists {
            if let Err(e) = store.save() {
                tracing::warn!("Could not initialize progress file: {}", e);
            }
        }
        store
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    /// Make `opening_id` the active opening. The record is re-initialized
    /// with a fresh random line order when the stored opening differs, or
    /// when the stored order no longer fits `line_count` lines.
    ///
    /// Returns whether the record was re-initialized.
    pub fn ensure_opening(
        &mut self,
        opening_id: &str,
        line_count: usize,
        rng: &mut impl Rng,
    ) -> Result<bool, PersistenceError> {
        if self.record.opening_id == opening_id && self.record.is_permutation_of(line_count) {
            return Ok(false);
        }
        if self.record.opening_id == opening_id {
            tracing::warn!(
                "Stored line order for opening {} does not match {} lines, starting over",
                opening_id,
                line_count
            );
        }
        self.init_opening(opening_id, line_count, rng)?;
        Ok(true)
    }

    /// Reset the record for `opening_id` with a shuffled line order.
    pub fn init_opening(
        &mut self,
        opening_id: &str,
        line_count: usize,
        rng: &mut impl Rng,
    ) -> Result<(), PersistenceError> {
        let mut order: Vec<usize> = (0..line_count).collect();
        order.shuffle(rng);
        self.record = ProgressRecord {
            opening_id: opening_id.to_string(),
            line_order: order,
            current_line_pointer: 0,
            ply_index: 0,
            mistakes: Vec::new(),
        };
        tracing::info!("Initialized progress for opening {} ({} lines)", opening_id, line_count);
        self.save()
    }

    /// Note a wrong move at `(line_ptr, ply)`. Returns false if that pair
    /// was already recorded.
    pub fn record_mistake(
        &mut self,
        line_ptr: usize,
        ply: usize,
        mv: &str,
    ) -> Result<bool, PersistenceError> {
        if self
            .record
            .mistakes
            .iter()
            .any(|m| m.line_ptr == line_ptr && m.ply == ply)
        {
            return Ok(false);
        }
        self.record.mistakes.push(ProgressMistake {
            line_ptr,
            ply,
            mv: mv.to_string(),
        });
        self.save()?;
        Ok(true)
    }

    pub fn advance_ply(&mut self) -> Result<(), PersistenceError> {
        self.record.ply_index += 1;
        self.save()
    }

    pub fn advance_line(&mut self) -> Result<(), PersistenceError> {
        self.record.current_line_pointer += 1;
        self.record.ply_index = 0;
        self.save()
    }

    fn save(&self) -> Result<(), PersistenceError> {
        self.document.save(&self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn store(dir: &tempfile::TempDir) -> ProgressStore {
        ProgressStore::open(dir.path().join("user_data").join("progress.json"))
    }

    #[test]
    fn missing_file_is_initialized_blank() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert_eq!(store.record(), &ProgressRecord::default());
        assert!(dir.path().join("user_data").join("progress.json").exists());
    }

    #[test]
    fn corrupt_file_yields_blank_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "not json at all").unwrap();
        let store = ProgressStore::open(path);
        assert_eq!(store.record(), &ProgressRecord::default());
    }

    #[test]
    fn ensure_opening_produces_a_permutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        let mut rng = StdRng::seed_from_u64(7);

        for line_count in [1, 2, 5, 17] {
            let id = format!("opening-{}", line_count);
            assert!(store.ensure_opening(&id, line_count, &mut rng).unwrap());
            let mut order = store.record().line_order.clone();
            order.sort_unstable();
            assert_eq!(order, (0..line_count).collect::<Vec<_>>());
            assert_eq!(store.record().current_line_pointer, 0);
            assert_eq!(store.record().ply_index, 0);
        }
    }

    #[test]
    fn ensure_same_opening_keeps_the_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        let mut rng = StdRng::seed_from_u64(1);
        store.ensure_opening("1", 3, &mut rng).unwrap();
        store.advance_ply().unwrap();
        store.advance_ply().unwrap();

        assert!(!store.ensure_opening("1", 3, &mut rng).unwrap());
        assert_eq!(store.record().ply_index, 2);

        // The opening grew a line since the record was written
        assert!(store.ensure_opening("1", 4, &mut rng).unwrap());
        assert_eq!(store.record().ply_index, 0);
    }

    #[test]
    fn mistakes_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        store.ensure_opening("1", 2, &mut StdRng::seed_from_u64(3)).unwrap();
        assert!(store.record_mistake(0, 3, "b8c6").unwrap());
        assert!(!store.record_mistake(0, 3, "b8c6").unwrap());
        assert!(store.record_mistake(1, 3, "g8f6").unwrap());
        assert_eq!(store.record().mistakes.len(), 2);
        assert_eq!(store.record().mistake_plies(0), vec![3]);
    }

    #[test]
    fn advance_line_resets_ply() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        store.ensure_opening("1", 2, &mut StdRng::seed_from_u64(5)).unwrap();
        store.advance_ply().unwrap();
        store.advance_line().unwrap();
        assert_eq!(store.record().current_line_pointer, 1);
        assert_eq!(store.record().ply_index, 0);
        assert!(!store.record().is_finished());
        store.advance_line().unwrap();
        assert!(store.record().is_finished());
        assert_eq!(store.record().current_line(), None);
    }

    #[test]
    fn every_mutation_is_written_through() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = store(&dir);
        first.ensure_opening("9", 3, &mut StdRng::seed_from_u64(11)).unwrap();
        first.advance_ply().unwrap();
        first.record_mistake(0, 0, "e2e4").unwrap();

        let reopened = store(&dir);
        assert_eq!(reopened.record(), first.record());
    }

    #[test]
    fn document_uses_the_documented_field_names() {
        let record = ProgressRecord {
            opening_id: "4".to_string(),
            line_order: vec![1, 0],
            current_line_pointer: 1,
            ply_index: 2,
            mistakes: vec![ProgressMistake {
                line_ptr: 1,
                ply: 2,
                mv: "g1f3".to_string(),
            }],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "openingId": "4",
                "lineOrder": [1, 0],
                "currentLinePointer": 1,
                "plyIndex": 2,
                "mistakes": [{"linePtr": 1, "ply": 2, "move": "g1f3"}]
            })
        );
    }
}
