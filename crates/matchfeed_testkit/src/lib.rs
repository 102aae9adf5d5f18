//! # Matchfeed Testkit
//!
//! Test utilities for matchfeed.
//!
//! This crate provides:
//! - Germany vs Japan event files and their reference summary
//! - Property-based test generators using proptest
//! - A loopback broker speaking the server side of the protocol over TCP
//!
//! ## Usage
//!
//! ```rust,ignore
//! use matchfeed_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn joins_a_game() {
//!     let broker = LoopbackBroker::start().await.unwrap();
//!     let login = format!("login {} alice pass", broker.addr());
//!     // ... drive a client against the broker
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod broker;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::broker::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use broker::*;
pub use fixtures::*;
pub use generators::*;
