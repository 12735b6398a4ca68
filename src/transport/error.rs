//! Socket queue error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to the caller of a queued command.
///
/// Each error is delivered to exactly the entry that experienced it. The queue
/// never retries on the caller's behalf.
#[derive(Debug, Error)]
pub enum QueueError {
    /// `create_socket` was called while a live socket exists.
    #[error("socket already created")]
    AlreadyCreated,

    /// The socket factory failed. The socket is left unbound.
    #[error("socket creation failed: {0}")]
    CreationFailed(#[source] io::Error),

    /// The write/response cycle failed. The socket has been closed.
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),

    /// No response arrived within the entry's timeout. The socket has been
    /// closed.
    #[error("no response within {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The queue was destroyed while this entry was pending or active.
    #[error("socket destroyed: {0}")]
    Destroyed(String),
}

impl QueueError {
    /// Whether this failure tore down the socket it occurred on.
    pub fn is_teardown(&self) -> bool {
        matches!(self, QueueError::Transport(_) | QueueError::Timeout(_))
    }

    /// Whether resending the same command against a fresh socket could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QueueError::Transport(_) | QueueError::Timeout(_) | QueueError::CreationFailed(_)
        )
    }

    /// The underlying I/O error, if any.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            QueueError::CreationFailed(e) | QueueError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for queued commands.
pub type QueueResult<T> = Result<T, QueueError>;
