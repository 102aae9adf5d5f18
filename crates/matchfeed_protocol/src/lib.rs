//! # Matchfeed Protocol
//!
//! Wire protocol types and codecs for matchfeed.
//!
//! This crate provides:
//! - `RawFrame` for the text frame format (command, headers, body)
//! - Typed client and server frames (`ClientFrame`, `ServerFrame`)
//! - `GameEvent` and its wire body encoding
//! - `GameKey` canonicalisation of free-form game names
//!
//! This is a pure protocol crate with no I/O operations. The NUL frame
//! terminator is appended and stripped by the transport.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod error;
mod event;
mod frame;
mod key;
mod messages;

pub use error::{ProtocolError, ProtocolResult};
pub use event::{GameEvent, UpdateMap, UNKNOWN_OWNER};
pub use frame::{RawFrame, FRAME_TERMINATOR};
pub use key::{normalize, pretty_print, GameKey};
pub use messages::{ClientFrame, ServerFrame};

/// Protocol version advertised in `CONNECT` frames.
pub const PROTOCOL_VERSION: &str = "1.2";
