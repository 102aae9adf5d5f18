//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while decoding frames and event bodies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame contained no command line.
    #[error("empty frame")]
    EmptyFrame,

    /// The command keyword is not part of the protocol.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A required header was absent.
    #[error("{command} frame is missing the '{header}' header")]
    MissingHeader {
        /// Command keyword of the frame.
        command: String,
        /// Name of the missing header.
        header: &'static str,
    },

    /// A required event body field was absent.
    #[error("event body is missing the '{0}' field")]
    MissingField(&'static str),

    /// A field had a value that could not be interpreted.
    #[error("invalid value for '{field}': {value}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}

impl ProtocolError {
    /// Creates a missing-header error.
    pub fn missing_header(command: impl Into<String>, header: &'static str) -> Self {
        Self::MissingHeader {
            command: command.into(),
            header,
        }
    }
}
