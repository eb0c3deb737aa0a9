//! Interactive drill sessions.
//!
//! Sessions are plain state machines: they react to a submitted move or a
//! fired timer, run to completion, and report what happened through a
//! [`TrainerEvent`] channel. Delays are requested through a single
//! [`TimerSlot`] and carried out by whoever drives the session, normally
//! the actor in [`actor`].

pub mod actor;
pub mod events;
pub mod handle;
pub mod review;
pub mod timer;
pub mod training;

use std::time::Duration;

use cozy_chess::{Board, Move};

use crate::config;

pub use actor::{parse_user_move, spawn_session};
pub use events::{event_channel, EventReceiver, EventSender, ReviewOutcome, TrainerEvent};
pub use handle::{Hint, SessionError, SessionHandle};
pub use review::{ReviewSession, ReviewState};
pub use timer::{PendingTimer, TimerSlot};
pub use training::{TrainingError, TrainingPhase, TrainingSession};

/// How a submitted move was judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveVerdict {
    /// The session was not waiting for a move; nothing changed.
    Ignored,
    Correct,
    /// `expected` is the move that should have been played, in SAN when it
    /// can be derived and UCI otherwise.
    Incorrect { expected: String },
}

/// Pauses between automatic steps of a training session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDelays {
    /// Before a scripted opponent reply or the start of a drill step.
    pub opponent_move: Duration,
    /// How long a wrong-move or feedback message stays up.
    pub error_display: Duration,
}

impl SessionDelays {
    pub fn from_millis(opponent_move_ms: u64, error_display_ms: u64) -> Self {
        Self {
            opponent_move: Duration::from_millis(opponent_move_ms),
            error_display: Duration::from_millis(error_display_ms),
        }
    }

    /// No pauses at all.
    pub fn immediate() -> Self {
        Self::from_millis(0, 0)
    }
}

impl Default for SessionDelays {
    fn default() -> Self {
        Self::from_millis(
            config::DEFAULT_OPPONENT_DELAY_MS,
            config::DEFAULT_ERROR_DISPLAY_DELAY_MS,
        )
    }
}

/// The surface an actor needs to drive a session.
pub trait DrillSession: Send + 'static {
    /// Emit the opening events and schedule the first step.
    fn start(&mut self);
    fn submit_move(&mut self, mv: Move) -> MoveVerdict;
    /// The move the session expects next, without changing any state.
    fn hint(&self) -> Option<Move>;
    /// Position the player is asked to move from.
    fn board(&self) -> &Board;
    fn pending_timer(&self) -> Option<PendingTimer>;
    /// Run the pending delayed step, if any.
    fn fire_timer(&mut self);
    fn is_finished(&self) -> bool;
}
