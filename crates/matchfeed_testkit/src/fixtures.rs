//! Event files and expected summaries.
//!
//! The Germany vs Japan game is reported in two files: a complete timeline
//! and a partial one that stops before halftime.

use matchfeed_protocol::{GameEvent, RawFrame};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Complete Germany vs Japan event file.
pub const EVENTS_FULL_JSON: &str = include_str!("../data/events1.json");

/// Germany vs Japan event file without `halftime` and `final whistle`.
pub const EVENTS_PARTIAL_JSON: &str = include_str!("../data/events1_partial.json");

/// Summary rendered from [`EVENTS_FULL_JSON`].
pub const GERMANY_JAPAN_SUMMARY: &str = include_str!("../data/summary_germany_japan.txt");

/// Game name as users type it.
pub const GERMANY_JAPAN: &str = "Germany_Japan";

/// A temporary directory holding event files and summary outputs.
pub struct FixtureDir {
    dir: TempDir,
}

impl FixtureDir {
    /// Creates an empty fixture directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Root of the directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes `contents` to `name` and returns its path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).expect("Failed to write fixture");
        path
    }

    /// Writes the complete event file.
    pub fn full_events(&self) -> PathBuf {
        self.write("events1.json", EVENTS_FULL_JSON)
    }

    /// Writes the partial event file.
    pub fn partial_events(&self) -> PathBuf {
        self.write("events1_partial.json", EVENTS_PARTIAL_JSON)
    }

    /// Reads `name` back.
    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).expect("Failed to read fixture")
    }
}

impl Default for FixtureDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the `MESSAGE` frame a server delivers for `event` reported by
/// `user` to `/destination`.
pub fn message_frame(destination: &str, event: &GameEvent, user: &str) -> RawFrame {
    RawFrame::new("MESSAGE")
        .with_header("subscription", 0)
        .with_header("message-id", 1)
        .with_header("destination", format!("/{destination}"))
        .with_body(event.to_body(user))
}
