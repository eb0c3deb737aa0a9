//! Learn-then-drill training over the lines of one opening.
//!
//! Lines are played in the order stored in the [`ProgressStore`]. Within a
//! line the player must find each of their book moves; opponent replies are
//! played automatically. Plies the player got wrong are drilled again once
//! the line is finished, before moving on.

use std::collections::VecDeque;

use chess::{format_uci_move, to_standard_uci, Game, GameError, Side, StartPosition};
use cozy_chess::{Board, Move};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::events::{EventSender, TrainerEvent};
use super::timer::{PendingTimer, TimerSlot};
use super::{DrillSession, MoveVerdict, SessionDelays};
use crate::lines::Line;
use crate::opening::Opening;
use crate::persistence::PersistenceError;
use crate::progress::ProgressStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingPhase {
    /// Playing through the current line ply by ply.
    Learn,
    /// Re-drilling the plies missed while learning the current line.
    ReviewMistakes,
    SessionDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrainingStep {
    ProcessNext,
    OpponentReply,
    NextReviewItem,
}

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("Opening '{0}' has no lines to train")]
    NoLines(String),
    #[error("Invalid start position: {0}")]
    StartPosition(#[from] GameError),
}

pub struct TrainingSession {
    opening_name: String,
    player: Side,
    lines: Vec<Line>,
    start: StartPosition,
    delays: SessionDelays,
    progress: ProgressStore,
    game: Game,
    line: Line,
    ply: usize,
    phase: TrainingPhase,
    /// Plies of the current line answered wrongly, each at most once.
    mistakes_in_line: Vec<usize>,
    review_queue: VecDeque<usize>,
    next_round: Vec<usize>,
    timer: TimerSlot<TrainingStep>,
    rng: StdRng,
    events: EventSender,
}

impl TrainingSession {
    pub fn new(
        opening: &Opening,
        progress: ProgressStore,
        delays: SessionDelays,
        events: EventSender,
    ) -> Result<Self, TrainingError> {
        Self::with_rng(opening, progress, delays, events, StdRng::from_entropy())
    }

    /// Like [`TrainingSession::new`] with a caller-provided random source,
    /// which fixes line order and review order.
    pub fn with_rng(
        opening: &Opening,
        mut progress: ProgressStore,
        delays: SessionDelays,
        events: EventSender,
        mut rng: StdRng,
    ) -> Result<Self, TrainingError> {
        if opening.lines.is_empty() {
            return Err(TrainingError::NoLines(opening.name.clone()));
        }
        let start = opening.start_position();
        let game = Game::from_start(start.clone())?;

        let opening_id = opening.id.to_string();
        let line_count = opening.lines.len();
        match progress.ensure_opening(&opening_id, line_count, &mut rng) {
            Ok(false) if progress.record().is_finished() => {
                // A finished opening starts a fresh pass.
                if let Err(e) = progress.init_opening(&opening_id, line_count, &mut rng) {
                    tracing::error!("Failed to save progress: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Failed to save progress: {}", e),
        }

        Ok(Self {
            opening_name: opening.name.clone(),
            player: opening.side,
            lines: opening.lines.clone(),
            start,
            delays,
            progress,
            game,
            line: Vec::new(),
            ply: 0,
            phase: TrainingPhase::Learn,
            mistakes_in_line: Vec::new(),
            review_queue: VecDeque::new(),
            next_round: Vec::new(),
            timer: TimerSlot::new(),
            rng,
            events,
        })
    }

    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    /// Index of the next ply to play in the current line.
    pub fn ply(&self) -> usize {
        self.ply
    }

    pub fn current_line(&self) -> &[Move] {
        &self.line
    }

    pub fn player(&self) -> Side {
        self.player
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Plies queued for re-drilling in the current line, in presentation order.
    pub fn review_queue(&self) -> Vec<usize> {
        self.review_queue.iter().copied().collect()
    }

    /// Whether a submitted move would be judged right now.
    pub fn awaiting_input(&self) -> bool {
        match self.phase {
            TrainingPhase::Learn => {
                self.ply < self.line.len()
                    && self.game.side_to_move() == self.player
                    && self.timer.action() != Some(TrainingStep::OpponentReply)
            }
            TrainingPhase::ReviewMistakes => {
                !self.timer.is_pending() && !self.review_queue.is_empty()
            }
            TrainingPhase::SessionDone => false,
        }
    }

    fn emit(&self, event: TrainerEvent) {
        let _ = self.events.send(event);
    }

    fn report_save(&self, result: Result<(), PersistenceError>) {
        if let Err(e) = result {
            tracing::error!("Failed to save progress: {}", e);
            self.emit(TrainerEvent::Info(format!("Progress could not be saved: {}", e)));
        }
    }

    fn emit_board(&self) {
        self.emit(TrainerEvent::BoardUpdated {
            fen: self.game.to_fen(),
            last_move: self.game.history().last().map(|entry| entry.san.clone()),
        });
    }

    fn emit_progress(&self, step: usize) {
        let record = self.progress.record();
        self.emit(TrainerEvent::Progress {
            line_idx: record.current_line_pointer + 1,
            line_total: record.line_order.len(),
            step_idx: step.min(self.line.len()),
            step_total: self.line.len(),
        });
    }

    fn san_or_uci(&self, mv: Move) -> String {
        self.game.san(mv).unwrap_or_else(|_| format_uci_move(mv))
    }

    /// Replay the current line up to (not including) `ply`.
    fn setup_board_to(&mut self, ply: usize) -> bool {
        let Some(moves) = self.line.get(..ply) else {
            tracing::warn!("Ply {} is past the end of the line ({} plies)", ply, self.line.len());
            return false;
        };
        match Game::replay(self.start.clone(), moves) {
            Ok(game) => {
                self.game = game;
                true
            }
            Err(e) => {
                tracing::error!("Line of '{}' cannot be replayed: {}", self.opening_name, e);
                false
            }
        }
    }

    fn begin_current_line(&mut self) {
        let record = self.progress.record();
        let pointer = record.current_line_pointer;
        let total = record.line_order.len();
        let Some(line) = record.current_line().and_then(|i| self.lines.get(i)).cloned() else {
            self.finish_session();
            return;
        };
        let resume_ply = record.ply_index.min(line.len());
        let mut restored = record.mistake_plies(pointer);
        restored.dedup();
        restored.retain(|&ply| {
            let fits = ply < line.len();
            if !fits {
                tracing::warn!("Dropping stored mistake at ply {}: line has {} plies", ply, line.len());
            }
            fits
        });

        self.line = line;
        self.ply = resume_ply;
        self.mistakes_in_line = restored;
        self.review_queue.clear();
        self.next_round.clear();
        self.phase = TrainingPhase::Learn;

        if !self.setup_board_to(self.ply) {
            self.complete_line();
            return;
        }
        tracing::info!(opening = %self.opening_name, "Starting line {} of {} at ply {}", pointer + 1, total, self.ply);

        self.emit_board();
        self.emit(TrainerEvent::Info(format!("Line {} of {}", pointer + 1, total)));
        self.emit_progress(self.ply + 1);
        self.timer
            .schedule(self.delays.opponent_move, TrainingStep::ProcessNext);
    }

    fn process_next(&mut self) {
        if self.phase != TrainingPhase::Learn {
            return;
        }
        if self.ply >= self.line.len() {
            if self.mistakes_in_line.is_empty() {
                self.complete_line();
            } else {
                self.enter_review();
            }
            return;
        }

        self.emit_board();
        self.emit_progress(self.ply + 1);
        if self.game.side_to_move() == self.player {
            self.emit(TrainerEvent::Info("Your move.".to_string()));
        } else {
            self.emit(TrainerEvent::Info("Opponent is moving...".to_string()));
            self.timer
                .schedule(self.delays.opponent_move, TrainingStep::OpponentReply);
        }
    }

    /// Play the book move at the current ply and persist the advance.
    fn play_line_move(&mut self) -> bool {
        let mv = self.line[self.ply];
        if let Err(e) = self.game.make_move(mv) {
            tracing::error!("Book move {} is not playable: {}", format_uci_move(mv), e);
            return false;
        }
        self.ply += 1;
        let saved = self.progress.advance_ply();
        self.report_save(saved);
        true
    }

    fn play_opponent_move(&mut self) {
        if self.phase != TrainingPhase::Learn || self.ply >= self.line.len() {
            return;
        }
        if !self.play_line_move() {
            self.complete_line();
            return;
        }
        self.process_next();
    }

    fn learn_move(&mut self, mv: Move) -> MoveVerdict {
        if self.timer.action() == Some(TrainingStep::ProcessNext) {
            self.timer.cancel();
        }
        let expected = self.line[self.ply];

        if mv == expected {
            if !self.play_line_move() {
                self.complete_line();
                return MoveVerdict::Correct;
            }
            self.emit_board();
            self.emit_progress(self.ply + 1);
            self.process_next();
            return MoveVerdict::Correct;
        }

        let expected_san = self.san_or_uci(expected);
        let first_miss = !self.mistakes_in_line.contains(&self.ply);
        if first_miss {
            self.mistakes_in_line.push(self.ply);
            let pointer = self.progress.record().current_line_pointer;
            let recorded = self
                .progress
                .record_mistake(pointer, self.ply, &to_standard_uci(self.game.position(), expected))
                .map(|_| ());
            self.report_save(recorded);
        }

        tracing::debug!("Wrong move at ply {}: expected {}", self.ply, expected_san);
        self.emit(TrainerEvent::Info(format!(
            "Wrong! The correct move is {}.",
            expected_san
        )));
        // Stored once per ply; repeats only get feedback
        if first_miss {
            self.emit(TrainerEvent::Mistake {
                user_move: mv,
                expected_move: expected,
                expected_san: expected_san.clone(),
                fen: self.game.to_fen(),
            });
        }
        self.timer
            .schedule(self.delays.error_display, TrainingStep::ProcessNext);
        MoveVerdict::Incorrect {
            expected: expected_san,
        }
    }

    fn enter_review(&mut self) {
        let mut queue = self.mistakes_in_line.clone();
        queue.shuffle(&mut self.rng);
        self.review_queue = queue.into();
        self.next_round.clear();
        self.phase = TrainingPhase::ReviewMistakes;

        tracing::info!("Reviewing {} missed plies", self.review_queue.len());
        self.emit(TrainerEvent::Info(
            "Line finished. Let's review your mistakes.".to_string(),
        ));
        self.timer
            .schedule(self.delays.opponent_move, TrainingStep::NextReviewItem);
    }

    fn next_review_item(&mut self) {
        if self.phase != TrainingPhase::ReviewMistakes {
            return;
        }
        let Some(&ply) = self.review_queue.front() else {
            if self.next_round.is_empty() {
                self.complete_line();
            } else {
                let mut queue = std::mem::take(&mut self.next_round);
                queue.shuffle(&mut self.rng);
                self.review_queue = queue.into();
                self.emit(TrainerEvent::Info("Once more for the ones you missed.".to_string()));
                self.timer
                    .schedule(self.delays.opponent_move, TrainingStep::NextReviewItem);
            }
            return;
        };

        if !self.setup_board_to(ply) {
            self.review_queue.pop_front();
            self.timer
                .schedule(self.delays.opponent_move, TrainingStep::NextReviewItem);
            return;
        }
        self.emit_board();
        self.emit_progress(ply + 1);
        self.emit(TrainerEvent::Info("Review: find the correct move.".to_string()));
    }

    fn review_move(&mut self, mv: Move) -> MoveVerdict {
        let Some(ply) = self.review_queue.pop_front() else {
            return MoveVerdict::Ignored;
        };
        let Some(&expected) = self.line.get(ply) else {
            tracing::warn!("Skipping review of ply {} past the end of the line", ply);
            self.timer
                .schedule(self.delays.opponent_move, TrainingStep::NextReviewItem);
            return MoveVerdict::Ignored;
        };

        let verdict = if mv == expected {
            if let Err(e) = self.game.make_move(mv) {
                tracing::warn!("Review move could not be shown: {}", e);
            }
            self.emit_board();
            self.emit(TrainerEvent::Info("Correct!".to_string()));
            MoveVerdict::Correct
        } else {
            let expected_san = self.san_or_uci(expected);
            if !self.next_round.contains(&ply) {
                self.next_round.push(ply);
            }
            self.emit(TrainerEvent::Info(format!(
                "Wrong! The correct move is {}.",
                expected_san
            )));
            MoveVerdict::Incorrect {
                expected: expected_san,
            }
        };

        self.timer
            .schedule(self.delays.error_display, TrainingStep::NextReviewItem);
        verdict
    }

    fn complete_line(&mut self) {
        self.timer.cancel();
        let line = self.progress.record().current_line().unwrap_or_default();
        tracing::info!(opening = %self.opening_name, "Line {} completed", line);
        self.emit(TrainerEvent::LineCompleted { line });

        let saved = self.progress.advance_line();
        self.report_save(saved);

        if self.progress.record().is_finished() {
            self.finish_session();
        } else {
            self.begin_current_line();
        }
    }

    fn finish_session(&mut self) {
        self.timer.cancel();
        self.phase = TrainingPhase::SessionDone;
        self.review_queue.clear();
        self.next_round.clear();
        tracing::info!(opening = %self.opening_name, "Training session completed");
        self.emit(TrainerEvent::Info(
            "Congratulations! You have trained every line.".to_string(),
        ));
        self.emit(TrainerEvent::SessionCompleted);
    }
}

impl DrillSession for TrainingSession {
    fn start(&mut self) {
        tracing::info!(opening = %self.opening_name, side = %self.player, "Training session started");
        self.begin_current_line();
    }

    fn submit_move(&mut self, mv: Move) -> MoveVerdict {
        if !self.awaiting_input() {
            tracing::debug!("Ignoring move while not awaiting input");
            return MoveVerdict::Ignored;
        }
        match self.phase {
            TrainingPhase::Learn => self.learn_move(mv),
            TrainingPhase::ReviewMistakes => self.review_move(mv),
            TrainingPhase::SessionDone => MoveVerdict::Ignored,
        }
    }

    fn hint(&self) -> Option<Move> {
        match self.phase {
            TrainingPhase::Learn => self.line.get(self.ply).copied(),
            TrainingPhase::ReviewMistakes => self
                .review_queue
                .front()
                .and_then(|&ply| self.line.get(ply).copied()),
            TrainingPhase::SessionDone => None,
        }
    }

    fn board(&self) -> &Board {
        self.game.position()
    }

    fn pending_timer(&self) -> Option<PendingTimer> {
        self.timer.pending()
    }

    fn fire_timer(&mut self) {
        match self.timer.take() {
            Some(TrainingStep::ProcessNext) => self.process_next(),
            Some(TrainingStep::OpponentReply) => self.play_opponent_move(),
            Some(TrainingStep::NextReviewItem) => self.next_review_item(),
            None => {}
        }
    }

    fn is_finished(&self) -> bool {
        self.phase == TrainingPhase::SessionDone
    }
}
