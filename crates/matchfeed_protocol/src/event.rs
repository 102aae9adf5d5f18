//! Game event records and their wire body.

use crate::error::{ProtocolError, ProtocolResult};
use std::collections::BTreeMap;

/// Ordered `key -> value` updates attached to an event.
pub type UpdateMap = BTreeMap<String, String>;

/// Owner assigned to events whose reporter is not known.
pub const UNKNOWN_OWNER: &str = "unknown";

const GENERAL_SECTION: &str = "general game updates:";
const TEAM_A_SECTION: &str = "team a updates:";
const TEAM_B_SECTION: &str = "team b updates:";

/// A single timestamped report about a game.
///
/// Events travel as the body of `SEND` and `MESSAGE` frames, see
/// [`GameEvent::to_body`] for the layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameEvent {
    /// Event name ("kickoff", "goal!!!!", ...).
    pub name: String,
    /// Game clock in seconds.
    pub time: i64,
    /// Free-form description.
    pub description: String,
    /// Updates about the game as a whole.
    pub general_updates: UpdateMap,
    /// Updates about the first team.
    pub team_a_updates: UpdateMap,
    /// Updates about the second team.
    pub team_b_updates: UpdateMap,
    /// Name of the first team.
    pub team_a: String,
    /// Name of the second team.
    pub team_b: String,
    /// User that reported the event.
    pub owner: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    General,
    TeamA,
    TeamB,
}

impl GameEvent {
    /// Creates an event with no updates, teams or owner.
    pub fn new(name: impl Into<String>, time: i64) -> Self {
        Self {
            name: name.into(),
            time,
            ..Self::default()
        }
    }

    /// Sets the team names.
    pub fn with_teams(mut self, team_a: impl Into<String>, team_b: impl Into<String>) -> Self {
        self.team_a = team_a.into();
        self.team_b = team_b.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the owner.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Adds a general update.
    pub fn with_general_update(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.general_updates.insert(key.into(), value.into());
        self
    }

    /// Adds a first-team update.
    pub fn with_team_a_update(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.team_a_updates.insert(key.into(), value.into());
        self
    }

    /// Adds a second-team update.
    pub fn with_team_b_update(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.team_b_updates.insert(key.into(), value.into());
        self
    }

    /// Returns the owner, or [`UNKNOWN_OWNER`] when none was recorded.
    pub fn owner(&self) -> &str {
        if self.owner.is_empty() {
            UNKNOWN_OWNER
        } else {
            &self.owner
        }
    }

    /// Total number of update entries across the three categories.
    pub fn update_count(&self) -> usize {
        self.general_updates.len() + self.team_a_updates.len() + self.team_b_updates.len()
    }

    /// Encodes the event as a frame body reported by `user`.
    pub fn to_body(&self, user: &str) -> String {
        let mut body = String::new();
        body.push_str(&format!("user:{user}\n"));
        body.push_str(&format!("team a:{}\n", self.team_a));
        body.push_str(&format!("team b:{}\n", self.team_b));
        body.push_str(&format!("event name:{}\n", self.name));
        body.push_str(&format!("time:{}\n", self.time));

        for (label, updates) in [
            (GENERAL_SECTION, &self.general_updates),
            (TEAM_A_SECTION, &self.team_a_updates),
            (TEAM_B_SECTION, &self.team_b_updates),
        ] {
            body.push_str(label);
            body.push('\n');
            for (key, value) in updates {
                body.push_str(&format!("    {key}:{value}\n"));
            }
        }

        body.push_str("description:\n");
        body.push_str(&self.description);
        body.push('\n');
        body
    }

    /// Decodes an event from a frame body.
    ///
    /// Unknown lines are ignored. Section entries are the indented lines
    /// following a section label; `description:` takes every remaining line.
    pub fn from_body(body: &str) -> ProtocolResult<Self> {
        let mut event = GameEvent::default();
        let mut name = None;
        let mut time = None;
        let mut section = None;
        let mut lines = body.lines();

        while let Some(line) = lines.next() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match trimmed {
                GENERAL_SECTION => {
                    section = Some(Section::General);
                    continue;
                }
                TEAM_A_SECTION => {
                    section = Some(Section::TeamA);
                    continue;
                }
                TEAM_B_SECTION => {
                    section = Some(Section::TeamB);
                    continue;
                }
                _ => {}
            }

            if let Some(current) = section {
                if line.starts_with(char::is_whitespace) {
                    if let Some((key, value)) = trimmed.split_once(':') {
                        let updates = match current {
                            Section::General => &mut event.general_updates,
                            Section::TeamA => &mut event.team_a_updates,
                            Section::TeamB => &mut event.team_b_updates,
                        };
                        updates.insert(key.trim().to_string(), value.trim().to_string());
                    }
                    continue;
                }
                section = None;
            }

            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "user" => event.owner = value.to_string(),
                "team a" => event.team_a = value.to_string(),
                "team b" => event.team_b = value.to_string(),
                "event name" => name = Some(value.to_string()),
                "time" => time = Some(value.to_string()),
                "description" => {
                    let mut parts: Vec<&str> = Vec::new();
                    if !value.is_empty() {
                        parts.push(value);
                    }
                    parts.extend(lines.by_ref());
                    event.description = parts.join("\n").trim_end().to_string();
                    break;
                }
                _ => {}
            }
        }

        event.name = name
            .filter(|n| !n.is_empty())
            .ok_or(ProtocolError::MissingField("event name"))?;
        let time = time.ok_or(ProtocolError::MissingField("time"))?;
        event.time = time.parse().map_err(|_| ProtocolError::InvalidField {
            field: "time",
            value: time.clone(),
        })?;
        if event.owner.is_empty() {
            event.owner = UNKNOWN_OWNER.to_string();
        }

        Ok(event)
    }
}
