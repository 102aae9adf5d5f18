//! Event description files.
//!
//! A report file is JSON:
//!
//! ```json
//! {
//!   "team a": "Germany",
//!   "team b": "Japan",
//!   "events": [
//!     {
//!       "event name": "kickoff",
//!       "time": 0,
//!       "general game updates": { "active": true },
//!       "team a updates": {},
//!       "team b updates": {},
//!       "description": "The game has started!"
//!     }
//!   ]
//! }
//! ```

use crate::error::{ClientError, ClientResult};
use matchfeed_protocol::{GameEvent, GameKey, UpdateMap};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The parsed content of an event file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameReport {
    /// First team.
    pub team_a: String,
    /// Second team.
    pub team_b: String,
    /// Events in file order, carrying the team names.
    pub events: Vec<GameEvent>,
}

impl GameReport {
    /// Canonical key of the game this report describes.
    pub fn game_key(&self) -> GameKey {
        GameKey::for_teams(&self.team_a, &self.team_b)
    }
}

#[derive(Deserialize)]
struct FileRepr {
    #[serde(rename = "team a")]
    team_a: String,
    #[serde(rename = "team b")]
    team_b: String,
    events: Vec<EventRepr>,
}

#[derive(Deserialize)]
struct EventRepr {
    #[serde(rename = "event name")]
    name: String,
    time: i64,
    #[serde(rename = "general game updates", default)]
    general_updates: BTreeMap<String, Value>,
    #[serde(rename = "team a updates", default)]
    team_a_updates: BTreeMap<String, Value>,
    #[serde(rename = "team b updates", default)]
    team_b_updates: BTreeMap<String, Value>,
    #[serde(default)]
    description: String,
}

fn to_updates(values: BTreeMap<String, Value>) -> UpdateMap {
    values
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect()
}

/// Parses event file content.
pub fn parse_events(json: &str) -> Result<GameReport, serde_json::Error> {
    let file: FileRepr = serde_json::from_str(json)?;
    let events = file
        .events
        .into_iter()
        .map(|e| GameEvent {
            name: e.name,
            time: e.time,
            description: e.description,
            general_updates: to_updates(e.general_updates),
            team_a_updates: to_updates(e.team_a_updates),
            team_b_updates: to_updates(e.team_b_updates),
            team_a: file.team_a.clone(),
            team_b: file.team_b.clone(),
            owner: String::new(),
        })
        .collect();

    Ok(GameReport {
        team_a: file.team_a,
        team_b: file.team_b,
        events,
    })
}

fn event_file_error(path: &Path, message: impl ToString) -> ClientError {
    ClientError::EventFile {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Reads and parses an event file, blocking the calling thread.
pub fn parse_events_file(path: &Path) -> ClientResult<GameReport> {
    let json = fs::read_to_string(path).map_err(|e| event_file_error(path, e))?;
    parse_events(&json).map_err(|e| event_file_error(path, e))
}

/// Reads and parses an event file on the async runtime.
pub async fn load_events_file(path: &Path) -> ClientResult<GameReport> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| event_file_error(path, e))?;
    parse_events(&json).map_err(|e| event_file_error(path, e))
}
