//! Interactive loop: stdin lines in, session events out.

use chess::{format_uci_move, parse_fen, to_standard_uci, Side};
use cozy_chess::Move;
use tokio::io::{AsyncBufReadExt, BufReader};
use trainer::persistence::sqlite::SqliteMistakeRepository;
use trainer::persistence::{now_timestamp, MistakeKey, MistakeRepository};
use trainer::session::{
    spawn_session, EventReceiver, ReviewOutcome, SessionError, SessionHandle, TrainerEvent,
};
use trainer::{DrillSession, MoveVerdict};

use crate::board_text::render_fen;
use crate::CliError;

/// Where training mistakes are written as they happen.
pub struct MistakeSink {
    pub repo: SqliteMistakeRepository,
    pub user_id: i64,
    pub opening_id: i64,
}

impl MistakeSink {
    async fn record(&self, fen: &str, expected: Move) {
        let correct = match parse_fen(fen) {
            Ok(board) => to_standard_uci(&board, expected),
            Err(_) => format_uci_move(expected),
        };
        let key = MistakeKey {
            fen: fen.to_string(),
            user_id: self.user_id,
            opening_id: Some(self.opening_id),
        };
        match self.repo.upsert_mistake(&key, &correct, now_timestamp()).await {
            Ok(mistake) => tracing::debug!("Mistake {} missed {} times", mistake.id, mistake.miss_count),
            Err(e) => tracing::error!("Failed to save mistake: {}", e),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Hint,
    Help,
    Quit,
    Move(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Empty,
        "hint" | "h" | "?" => Input::Hint,
        "help" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        text => Input::Move(text),
    }
}

const HELP: &str = "Type a move in SAN (Nf3) or UCI (g1f3). Commands: hint, help, quit.";

/// Text shown for an event, and whether the session is over.
fn describe(event: &TrainerEvent, perspective: Option<Side>) -> (Option<String>, bool) {
    let text = match event {
        TrainerEvent::BoardUpdated { fen, last_move } => {
            let board = render_fen(fen, perspective);
            match last_move {
                Some(san) => format!("{}\nLast move: {}", board, san),
                None => board,
            }
        }
        TrainerEvent::Info(message) => message.clone(),
        // Announced through Info; the sink stores it
        TrainerEvent::Mistake { .. } => return (None, false),
        TrainerEvent::Progress {
            line_idx,
            line_total,
            step_idx,
            step_total,
        } => format!("Line {}/{}, move {}/{}", line_idx, line_total, step_idx, step_total),
        TrainerEvent::LineCompleted { .. } => "Line complete.".to_string(),
        TrainerEvent::SessionCompleted => return (None, true),
        TrainerEvent::ReviewState {
            fen,
            remaining,
            total,
        } => format!(
            "{}\nPosition {} of {} remaining. Your move.",
            render_fen(fen, perspective),
            remaining,
            total
        ),
        TrainerEvent::ReviewFeedback {
            correct: true,
            correct_move,
        } => format!("Correct: {}", correct_move),
        TrainerEvent::ReviewFeedback {
            correct: false,
            correct_move,
        } => format!("Wrong, the move was {}", correct_move),
        TrainerEvent::ReviewFinished(ReviewOutcome::Completed) => {
            return (Some("Review complete!".to_string()), true)
        }
        TrainerEvent::ReviewFinished(ReviewOutcome::NoMistakes) => return (None, true),
    };
    (Some(text), false)
}

/// Drive `session` until it finishes, the user quits, or stdin closes.
/// Boards are drawn from `perspective`, or from the side to move.
pub async fn run_drill<S: DrillSession>(
    session: S,
    name: &str,
    mut events: EventReceiver,
    sink: Option<&MistakeSink>,
    perspective: Option<Side>,
) -> Result<(), CliError> {
    let (handle, task) = spawn_session(session, name);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if let (TrainerEvent::Mistake { fen, expected_move, .. }, Some(sink)) = (&event, sink) {
                    sink.record(fen, *expected_move).await;
                }
                let (text, done) = describe(&event, perspective);
                if let Some(text) = text {
                    println!("{}", text);
                }
                if done {
                    break;
                }
            }

            line = stdin.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("Input closed");
                    break;
                };
                match parse_input(&line) {
                    Input::Empty => {}
                    Input::Help => println!("{}", HELP),
                    Input::Quit => break,
                    Input::Hint => show_hint(&handle).await,
                    Input::Move(text) => submit(&handle, text).await,
                }
            }
        }
    }

    handle.shutdown().await;
    if let Err(e) = task.await {
        tracing::error!("Session task failed: {}", e);
    }
    Ok(())
}

async fn show_hint(handle: &SessionHandle) {
    match handle.hint().await {
        Ok(Some(hint)) => println!("Hint: {} ({})", hint.san, hint.uci),
        Ok(None) => println!("No move expected right now."),
        Err(e) => println!("{}", e),
    }
}

async fn submit(handle: &SessionHandle, text: &str) {
    match handle.submit_move(text).await {
        Ok(MoveVerdict::Ignored) => println!("Not your turn, wait a moment."),
        Ok(_) => {}
        Err(SessionError::InvalidMove(text)) => println!("'{}' is not a legal move here.", text),
        Err(e) => println!("{}", e),
    }
}
