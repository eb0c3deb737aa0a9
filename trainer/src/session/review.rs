//! Drill over previously recorded mistakes, independent of any opening.

use std::collections::VecDeque;
use std::time::Duration;

use chess::{format_san, parse_fen, parse_uci_move, to_standard_uci};
use cozy_chess::{Board, Move};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::events::{EventSender, ReviewOutcome, TrainerEvent};
use super::timer::{PendingTimer, TimerSlot};
use super::{DrillSession, MoveVerdict};
use crate::persistence::Mistake;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    /// Not started yet, or waiting out the feedback delay.
    Presenting,
    AwaitingAnswer,
    Finished(ReviewOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReviewStep {
    PresentNext,
}

/// A mistake with its position parsed once up front.
struct ReviewItem {
    mistake: Mistake,
    board: Board,
}

pub struct ReviewSession {
    pending: Vec<Mistake>,
    queue: VecDeque<ReviewItem>,
    /// Answered wrongly during the current pass.
    missed: Vec<ReviewItem>,
    total: usize,
    state: ReviewState,
    board: Board,
    feedback_delay: Duration,
    timer: TimerSlot<ReviewStep>,
    rng: StdRng,
    events: EventSender,
}

impl ReviewSession {
    pub fn new(mistakes: Vec<Mistake>, feedback_delay: Duration, events: EventSender) -> Self {
        Self::with_rng(mistakes, feedback_delay, events, StdRng::from_entropy())
    }

    pub fn with_rng(
        mistakes: Vec<Mistake>,
        feedback_delay: Duration,
        events: EventSender,
        rng: StdRng,
    ) -> Self {
        Self {
            pending: mistakes,
            queue: VecDeque::new(),
            missed: Vec::new(),
            total: 0,
            state: ReviewState::Presenting,
            board: Board::default(),
            feedback_delay,
            timer: TimerSlot::new(),
            rng,
            events,
        }
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    /// The mistake currently on the board.
    pub fn current(&self) -> Option<&Mistake> {
        match self.state {
            ReviewState::AwaitingAnswer => self.queue.front().map(|item| &item.mistake),
            _ => None,
        }
    }

    /// Items left in the current pass, including the one on the board.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    fn emit(&self, event: TrainerEvent) {
        let _ = self.events.send(event);
    }

    fn finish(&mut self, outcome: ReviewOutcome) {
        self.timer.cancel();
        self.state = ReviewState::Finished(outcome);
        tracing::info!("Review finished: {:?}", outcome);
        self.emit(TrainerEvent::ReviewFinished(outcome));
    }

    fn present_next(&mut self) {
        if matches!(self.state, ReviewState::Finished(_)) {
            return;
        }
        if self.queue.is_empty() {
            if self.missed.is_empty() {
                self.finish(ReviewOutcome::Completed);
                return;
            }
            let mut next_pass = std::mem::take(&mut self.missed);
            next_pass.shuffle(&mut self.rng);
            self.total = next_pass.len();
            self.queue = next_pass.into();
            tracing::debug!("Starting another pass over {} missed items", self.total);
        }

        let Some(head) = self.queue.front() else {
            return;
        };
        self.board = head.board.clone();
        let fen = head.mistake.fen.clone();
        self.state = ReviewState::AwaitingAnswer;
        self.emit(TrainerEvent::ReviewState {
            fen,
            remaining: self.queue.len(),
            total: self.total,
        });
    }

    /// Notation for the stored answer, falling back to the stored UCI when
    /// it no longer describes a legal move in the stored position.
    fn correct_move_notation(item: &ReviewItem) -> String {
        let stored = item.mistake.correct_move_uci.trim();
        match parse_uci_move(&item.board, stored) {
            Ok(mv) => format_san(&item.board, mv).unwrap_or_else(|_| stored.to_string()),
            Err(e) => {
                tracing::warn!(
                    "Stored answer {} for mistake {} is not playable: {}",
                    stored,
                    item.mistake.id,
                    e
                );
                stored.to_string()
            }
        }
    }
}

impl DrillSession for ReviewSession {
    /// Shuffle the mistakes for presentation. Entries whose position does
    /// not parse are dropped.
    fn start(&mut self) {
        let mut mistakes = std::mem::take(&mut self.pending);
        // Only a hint: the shuffle below decides presentation order
        mistakes.sort_by(|a, b| b.miss_count.cmp(&a.miss_count));

        let mut items: Vec<ReviewItem> = mistakes
            .into_iter()
            .filter_map(|mistake| match parse_fen(&mistake.fen) {
                Ok(board) => Some(ReviewItem { mistake, board }),
                Err(e) => {
                    tracing::warn!("Skipping mistake {} with bad FEN {:?}: {}", mistake.id, mistake.fen, e);
                    None
                }
            })
            .collect();
        items.shuffle(&mut self.rng);

        if items.is_empty() {
            self.emit(TrainerEvent::Info("No mistakes to review.".to_string()));
            self.finish(ReviewOutcome::NoMistakes);
            return;
        }

        tracing::info!("Review started with {} mistakes", items.len());
        self.total = items.len();
        self.queue = items.into();
        self.present_next();
    }

    fn submit_move(&mut self, mv: Move) -> MoveVerdict {
        if self.state != ReviewState::AwaitingAnswer {
            tracing::debug!("Ignoring move while not awaiting an answer");
            return MoveVerdict::Ignored;
        }
        let Some(item) = self.queue.pop_front() else {
            return MoveVerdict::Ignored;
        };

        let played = to_standard_uci(&item.board, mv);
        let correct = played.eq_ignore_ascii_case(item.mistake.correct_move_uci.trim());
        let notation = Self::correct_move_notation(&item);

        self.emit(TrainerEvent::ReviewFeedback {
            correct,
            correct_move: notation.clone(),
        });
        if !correct {
            self.missed.push(item);
        }

        self.state = ReviewState::Presenting;
        self.timer.schedule(self.feedback_delay, ReviewStep::PresentNext);

        if correct {
            MoveVerdict::Correct
        } else {
            MoveVerdict::Incorrect { expected: notation }
        }
    }

    fn hint(&self) -> Option<Move> {
        let item = self.queue.front()?;
        if self.state != ReviewState::AwaitingAnswer {
            return None;
        }
        parse_uci_move(&item.board, item.mistake.correct_move_uci.trim()).ok()
    }

    fn board(&self) -> &Board {
        &self.board
    }

    fn pending_timer(&self) -> Option<PendingTimer> {
        self.timer.pending()
    }

    fn fire_timer(&mut self) {
        if let Some(ReviewStep::PresentNext) = self.timer.take() {
            self.present_next();
        }
    }

    fn is_finished(&self) -> bool {
        matches!(self.state, ReviewState::Finished(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::events::{event_channel, EventReceiver};
    use chess::legal_moves;

    const START: &str = chess::STARTING_FEN;
    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
    const AFTER_E4_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";
    const CASTLE: &str = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1";

    fn mistake(id: i64, fen: &str, answer: &str, miss_count: u32) -> Mistake {
        Mistake {
            id,
            fen: fen.to_string(),
            correct_move_uci: answer.to_string(),
            user_id: 1,
            opening_id: Some(1),
            miss_count,
            last_missed_at: 0,
        }
    }

    fn session(mistakes: Vec<Mistake>) -> (ReviewSession, EventReceiver) {
        let (tx, rx) = event_channel();
        let session = ReviewSession::with_rng(mistakes, Duration::ZERO, tx, StdRng::seed_from_u64(42));
        (session, rx)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<TrainerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn answer_correctly(session: &mut ReviewSession) -> MoveVerdict {
        let mv = session.hint().unwrap();
        let verdict = session.submit_move(mv);
        session.fire_timer();
        verdict
    }

    fn answer_wrongly(session: &mut ReviewSession) -> MoveVerdict {
        let right = session.hint().unwrap();
        let wrong = legal_moves(session.board())
            .into_iter()
            .find(|&mv| mv != right)
            .unwrap();
        let verdict = session.submit_move(wrong);
        session.fire_timer();
        verdict
    }

    #[test]
    fn no_mistakes_presents_nothing() {
        let (mut session, mut rx) = session(Vec::new());
        session.start();
        assert_eq!(session.state(), ReviewState::Finished(ReviewOutcome::NoMistakes));
        let events = drain(&mut rx);
        assert!(events.contains(&TrainerEvent::ReviewFinished(ReviewOutcome::NoMistakes)));
        assert!(!events.iter().any(|e| matches!(e, TrainerEvent::ReviewState { .. })));
    }

    #[test]
    fn invalid_positions_are_dropped() {
        let (mut session, mut rx) = session(vec![mistake(1, "not a fen", "e2e4", 3)]);
        session.start();
        assert_eq!(session.state(), ReviewState::Finished(ReviewOutcome::NoMistakes));
        assert!(drain(&mut rx).contains(&TrainerEvent::ReviewFinished(ReviewOutcome::NoMistakes)));

        let (mut session, _rx) = session_with_one_good();
        session.start();
        assert_eq!(session.remaining(), 1);
        assert_eq!(session.current().unwrap().id, 2);
    }

    fn session_with_one_good() -> (ReviewSession, EventReceiver) {
        session(vec![
            mistake(1, "garbage", "e2e4", 5),
            mistake(2, START, "e2e4", 1),
        ])
    }

    #[test]
    fn one_wrong_answer_means_one_extra_presentation() {
        let (mut session, mut rx) = session(vec![
            mistake(1, START, "e2e4", 1),
            mistake(2, AFTER_E4, "e7e5", 2),
            mistake(3, AFTER_E4_E5, "g1f3", 3),
        ]);
        session.start();

        assert_eq!(answer_correctly(&mut session), MoveVerdict::Correct);
        let missed_id = session.current().unwrap().id;
        assert!(matches!(answer_wrongly(&mut session), MoveVerdict::Incorrect { .. }));
        assert_eq!(answer_correctly(&mut session), MoveVerdict::Correct);

        // Second pass holds only the missed item
        assert_eq!(session.current().unwrap().id, missed_id);
        assert_eq!(answer_correctly(&mut session), MoveVerdict::Correct);
        assert_eq!(session.state(), ReviewState::Finished(ReviewOutcome::Completed));

        let events = drain(&mut rx);
        let presented: Vec<(usize, usize)> = events
            .iter()
            .filter_map(|e| match e {
                TrainerEvent::ReviewState { remaining, total, .. } => Some((*remaining, *total)),
                _ => None,
            })
            .collect();
        assert_eq!(presented, vec![(3, 3), (2, 3), (1, 3), (1, 1)]);
        assert_eq!(
            events.last(),
            Some(&TrainerEvent::ReviewFinished(ReviewOutcome::Completed))
        );
    }

    #[test]
    fn feedback_reports_the_answer_in_san() {
        let (mut session, mut rx) = session(vec![mistake(1, AFTER_E4_E5, "g1f3", 1)]);
        session.start();
        let verdict = answer_wrongly(&mut session);
        assert_eq!(
            verdict,
            MoveVerdict::Incorrect {
                expected: "Nf3".to_string()
            }
        );
        assert!(drain(&mut rx).contains(&TrainerEvent::ReviewFeedback {
            correct: false,
            correct_move: "Nf3".to_string(),
        }));
    }

    #[test]
    fn unplayable_answer_falls_back_to_uci() {
        let (mut session, mut rx) = session(vec![mistake(1, START, "e2e5", 1)]);
        session.start();
        assert_eq!(session.hint(), None);
        let mv = chess::parse_uci_move(session.board(), "d2d4").unwrap();
        session.submit_move(mv);
        assert!(drain(&mut rx).contains(&TrainerEvent::ReviewFeedback {
            correct: false,
            correct_move: "e2e5".to_string(),
        }));
    }

    #[test]
    fn castling_answer_matches_standard_uci() {
        let (mut session, _rx) = session(vec![mistake(1, CASTLE, "e1g1", 1)]);
        session.start();
        let castle = chess::parse_uci_move(session.board(), "e1g1").unwrap();
        assert_eq!(session.submit_move(castle), MoveVerdict::Correct);
    }

    #[test]
    fn moves_during_feedback_are_ignored() {
        let (mut session, _rx) = session(vec![
            mistake(1, START, "e2e4", 1),
            mistake(2, AFTER_E4, "e7e5", 1),
        ]);
        session.start();
        let mv = session.hint().unwrap();
        assert_eq!(session.submit_move(mv), MoveVerdict::Correct);
        assert_eq!(session.state(), ReviewState::Presenting);
        assert!(session.pending_timer().is_some());
        assert_eq!(session.submit_move(mv), MoveVerdict::Ignored);
        session.fire_timer();
        assert_eq!(session.state(), ReviewState::AwaitingAnswer);
    }

    #[test]
    fn presentation_order_depends_only_on_the_seed() {
        let presented = |mistakes: Vec<Mistake>| {
            let (mut session, _rx) = session(mistakes);
            session.start();
            let mut ids = Vec::new();
            while let Some(current) = session.current() {
                ids.push(current.id);
                answer_correctly(&mut session);
            }
            ids
        };
        let a = mistake(1, START, "e2e4", 1);
        let b = mistake(2, AFTER_E4, "e7e5", 5);
        let c = mistake(3, AFTER_E4_E5, "g1f3", 3);

        let first = presented(vec![a.clone(), b.clone(), c.clone()]);
        let second = presented(vec![c, a, b]);
        assert_eq!(first, second);
        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3]);
    }
}
