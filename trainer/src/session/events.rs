use cozy_chess::Move;
use tokio::sync::mpsc;

/// Events emitted by the drill sessions to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainerEvent {
    /// The displayed position changed. `last_move` is in SAN.
    BoardUpdated {
        fen: String,
        last_move: Option<String>,
    },
    /// Free-form status text.
    Info(String),
    /// The player's move differed from the book move. `fen` is the
    /// position the wrong move was played from.
    Mistake {
        user_move: Move,
        expected_move: Move,
        expected_san: String,
        fen: String,
    },
    /// 1-based position within the opening and within the current line.
    Progress {
        line_idx: usize,
        line_total: usize,
        step_idx: usize,
        step_total: usize,
    },
    LineCompleted {
        line: usize,
    },
    SessionCompleted,
    /// A stored mistake is on the board awaiting an answer.
    ReviewState {
        fen: String,
        remaining: usize,
        total: usize,
    },
    ReviewFeedback {
        correct: bool,
        correct_move: String,
    },
    ReviewFinished(ReviewOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Every presented mistake was eventually answered correctly.
    Completed,
    /// There was nothing to review.
    NoMistakes,
}

pub type EventSender = mpsc::UnboundedSender<TrainerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<TrainerEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
