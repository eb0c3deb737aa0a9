pub mod analyzer;
pub mod archive;
pub mod config;
pub mod deviation;
pub mod lines;
pub mod opening;
pub mod persistence;
pub mod progress;
pub mod session;

pub use analyzer::{AnalysisReport, DeviationDetail, PerformanceAnalyzer};
pub use archive::{ArchiveError, ArchivedGame, GameArchive, PgnArchive, TimeRange};
pub use deviation::{find_alignment, find_deviation, find_deviation_from, Deviation};
pub use lines::{count_leaves, extract_lines, Line};
pub use opening::{LibraryError, Opening, OpeningLibrary};
pub use persistence::PersistenceError;
pub use progress::{ProgressMistake, ProgressRecord, ProgressStore};
pub use session::{
    DrillSession, MoveVerdict, ReviewSession, SessionDelays, SessionHandle, TrainerEvent,
    TrainingSession,
};
