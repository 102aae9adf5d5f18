//! # Matchfeed Client
//!
//! Protocol session engine for matchfeed.
//!
//! This crate provides:
//! - The command grammar typed by users (`login`, `join`, `exit`, `report`,
//!   `summary`, `logout`)
//! - Subscription and receipt bookkeeping
//! - Per-game, per-reporter event timelines
//! - Timeline reconciliation and summary rendering
//! - A NUL-delimited frame transport and an async client driver
//!
//! ## Architecture
//!
//! All protocol state lives in one [`Session`]. The session is a plain state
//! machine: a command or a server frame goes in, frames to send and notices
//! to print come out. [`Client`] owns the network connection and runs the
//! command loop and the frame loop against a shared, locked session.
//!
//! ## Key Invariants
//!
//! - At most one subscription per canonical game key
//! - A timeline never holds two events with the same `(time, name)`
//! - A summary only renders a complete timeline
//! - The session lock is never held across an `.await`

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod client;
mod command;
mod config;
mod error;
mod event_file;
mod receipts;
mod reconcile;
mod registry;
mod session;
mod store;
mod summary;
mod transport;

pub use client::Client;
pub use command::{Command, Endpoint};
pub use config::{ClientConfig, DEFAULT_HOST_HEADER};
pub use error::{ClientError, ClientResult, ErrorKind};
pub use event_file::{load_events_file, parse_events, parse_events_file, GameReport};
pub use receipts::{ReceiptAction, ReceiptTracker};
pub use reconcile::{detail_score, is_complete, reconcile, Reconciliation, Verdict, REQUIRED_MARKERS};
pub use registry::{LeaveOutcome, Subscription, SubscriptionRegistry};
pub use session::{Outcome, Session};
pub use store::{EventStore, GameTimelines, Timeline};
pub use summary::{chronological, render, GameStats, SummaryFile};
pub use transport::{connect, FrameReader, FrameWriter};
