use tokio::sync::{mpsc, oneshot};

use super::MoveVerdict;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Not a move in this position: {0}")]
    InvalidMove(String),
    #[error("Session has ended")]
    Closed,
}

/// A hint for the move the session expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub san: String,
    pub uci: String,
}

pub(crate) enum SessionCommand {
    /// A move typed by the user, in SAN or UCI.
    SubmitMove {
        text: String,
        reply: oneshot::Sender<Result<MoveVerdict, SessionError>>,
    },
    Hint {
        reply: oneshot::Sender<Option<Hint>>,
    },
    Shutdown,
}

/// Cheap, cloneable handle to a running session actor.
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(cmd_tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { cmd_tx }
    }

    pub async fn submit_move(&self, text: &str) -> Result<MoveVerdict, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::SubmitMove {
            text: text.to_string(),
            reply: tx,
        })
        .await?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn hint(&self) -> Result<Option<Hint>, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Hint { reply: tx }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown).await;
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.cmd_tx.send(cmd).await.map_err(|_| SessionError::Closed)
    }
}
