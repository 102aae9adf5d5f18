//! Error types for the client.

use matchfeed_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Broad classes of client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or incomplete command line.
    Usage,
    /// Command not valid in the current session state.
    State,
    /// Local input (event file, summary file) could not be used.
    Input,
    /// The connection failed.
    Transport,
    /// The server sent an `ERROR` frame or an unreadable frame.
    Protocol,
}

/// Errors that can occur while driving a session.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The command line could not be parsed.
    #[error("usage: {0}")]
    Usage(String),

    /// A command other than `login` was issued before logging in.
    #[error("Please login first")]
    NotLoggedIn,

    /// `login` was issued on a logged-in session.
    #[error("The client is already logged in, log out before trying again")]
    AlreadyLoggedIn,

    /// `join` on a game that already has an active subscription.
    #[error("already subscribed to {0}")]
    AlreadySubscribed(String),

    /// `exit` or `report` on a game without a subscription.
    #[error("not subscribed to {0}")]
    NotSubscribed(String),

    /// `summary` on a game the session knows nothing about.
    #[error("unknown game: {0}")]
    UnknownGame(String),

    /// The event file could not be read or parsed.
    #[error("cannot read event file {}: {message}", path.display())]
    EventFile {
        /// Path of the event file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The summary file could not be written.
    #[error("cannot write summary {}: {source}", path.display())]
    SummaryFile {
        /// Path of the summary file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Connecting, sending or receiving failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server rejected the session with an `ERROR` frame.
    #[error("{0}")]
    Server(String),

    /// A frame from the server could not be interpreted.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// Creates a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Creates a transport error.
    pub fn transport(message: impl ToString) -> Self {
        Self::Transport(message.to_string())
    }

    /// Returns the class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Usage(_) => ErrorKind::Usage,
            ClientError::NotLoggedIn
            | ClientError::AlreadyLoggedIn
            | ClientError::AlreadySubscribed(_)
            | ClientError::NotSubscribed(_)
            | ClientError::UnknownGame(_) => ErrorKind::State,
            ClientError::EventFile { .. } | ClientError::SummaryFile { .. } => ErrorKind::Input,
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Server(_) | ClientError::Protocol(_) => ErrorKind::Protocol,
        }
    }

    /// Returns true if this error ends the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Server(_))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
