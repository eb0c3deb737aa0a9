//! Event loop that owns a session and turns its timer requests into real
//! delays.

use chess::{format_san, parse_san, parse_uci_move, to_standard_uci};
use cozy_chess::Move;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::handle::{Hint, SessionCommand, SessionError, SessionHandle};
use super::{DrillSession, MoveVerdict};

/// Start `session` on its own task and return a handle to it.
///
/// The task ends when the handle (and all its clones) are dropped or
/// [`SessionHandle::shutdown`] is called.
pub fn spawn_session<S: DrillSession>(session: S, name: &str) -> (SessionHandle, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let span = tracing::info_span!("session", name = %name);
    let task = tokio::spawn(run_session_actor(session, cmd_rx).instrument(span));
    (SessionHandle::new(cmd_tx), task)
}

pub(crate) async fn run_session_actor<S: DrillSession>(
    mut session: S,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
) {
    tracing::info!("Session actor started");
    session.start();

    // (generation, deadline) of the timer we are currently waiting on
    let mut armed: Option<(u64, Instant)> = None;

    loop {
        armed = rearm(&session, armed);
        let deadline = armed.map(|(_, at)| at);

        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown) | None => {
                        tracing::info!("Session actor shutting down");
                        break;
                    }
                    Some(cmd) => handle_command(&mut session, cmd),
                }
            }

            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                armed = None;
                session.fire_timer();
            }
        }
    }

    tracing::info!("Session actor exited");
}

/// Arm a deadline for the session's pending timer, keeping an existing
/// deadline if the timer has not been rescheduled since.
fn rearm<S: DrillSession>(session: &S, armed: Option<(u64, Instant)>) -> Option<(u64, Instant)> {
    let pending = session.pending_timer()?;
    match armed {
        Some((generation, at)) if generation == pending.generation => Some((generation, at)),
        _ => Some((pending.generation, Instant::now() + pending.delay)),
    }
}

fn handle_command<S: DrillSession>(session: &mut S, cmd: SessionCommand) {
    match cmd {
        SessionCommand::SubmitMove { text, reply } => {
            let result = parse_user_move(session.board(), &text).map(|mv| session.submit_move(mv));
            if let Ok(MoveVerdict::Ignored) = result {
                tracing::debug!("Move {} ignored", text);
            }
            let _ = reply.send(result);
        }
        SessionCommand::Hint { reply } => {
            let board = session.board();
            let hint = session.hint().map(|mv| Hint {
                san: format_san(board, mv).unwrap_or_else(|_| to_standard_uci(board, mv)),
                uci: to_standard_uci(board, mv),
            });
            let _ = reply.send(hint);
        }
        SessionCommand::Shutdown => {}
    }
}

/// Read a move typed as UCI or SAN.
pub fn parse_user_move(board: &cozy_chess::Board, text: &str) -> Result<Move, SessionError> {
    let text = text.trim();
    parse_uci_move(board, text)
        .or_else(|_| parse_san(board, text))
        .map_err(|_| SessionError::InvalidMove(text.to_string()))
}
