//! Per-game, per-reporter event timelines.

use matchfeed_protocol::{GameEvent, GameKey};
use std::collections::HashMap;
use tracing::debug;

/// Ordered events of one reporter for one game.
///
/// # Invariants
///
/// - No two events share the same `(time, name)` pair
/// - Events keep their arrival order; an update replaces in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    owner: String,
    events: Vec<GameEvent>,
}

impl Timeline {
    /// Creates an empty timeline for `owner`.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            events: Vec::new(),
        }
    }

    /// Reporter of this timeline.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Events in arrival order.
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the timeline holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Inserts an event, replacing one with the same `(time, name)`.
    ///
    /// Returns true if an existing event was replaced.
    pub fn upsert(&mut self, event: GameEvent) -> bool {
        match self
            .events
            .iter_mut()
            .find(|e| e.time == event.time && e.name == event.name)
        {
            Some(existing) => {
                *existing = event;
                true
            }
            None => {
                self.events.push(event);
                false
            }
        }
    }

    fn clear(&mut self) {
        self.events.clear();
    }
}

/// All timelines of one game, in the order their reporters first appeared.
#[derive(Debug, Clone, Default)]
pub struct GameTimelines {
    timelines: Vec<Timeline>,
}

impl GameTimelines {
    /// Returns the timeline of `owner`.
    pub fn get(&self, owner: &str) -> Option<&Timeline> {
        self.timelines.iter().find(|t| t.owner == owner)
    }

    fn get_or_insert(&mut self, owner: &str) -> &mut Timeline {
        let index = match self.timelines.iter().position(|t| t.owner == owner) {
            Some(index) => index,
            None => {
                self.timelines.push(Timeline::new(owner));
                self.timelines.len() - 1
            }
        };
        &mut self.timelines[index]
    }

    /// Iterates over every reporter's timeline.
    pub fn iter(&self) -> impl Iterator<Item = &Timeline> {
        self.timelines.iter()
    }

    /// Returns true if no reporter has any event.
    pub fn is_empty(&self) -> bool {
        self.timelines.iter().all(Timeline::is_empty)
    }
}

/// Event timelines for every game seen by the session.
#[derive(Debug, Default)]
pub struct EventStore {
    games: HashMap<GameKey, GameTimelines>,
}

impl EventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores one event under its owner, upserting by `(time, name)`.
    pub fn store(&mut self, game: &GameKey, event: GameEvent) {
        let owner = event.owner().to_string();
        let timeline = self.games.entry(game.clone()).or_default().get_or_insert(&owner);
        let replaced = timeline.upsert(event);
        debug!(game = %game, owner = %owner, replaced, "stored event");
    }

    /// Replaces `owner`'s timeline for `game` with `events`.
    ///
    /// Every event is re-owned by `owner`.
    pub fn report(&mut self, game: &GameKey, owner: &str, events: impl IntoIterator<Item = GameEvent>) {
        let timeline = self.games.entry(game.clone()).or_default().get_or_insert(owner);
        timeline.clear();
        for mut event in events {
            event.owner = owner.to_string();
            timeline.upsert(event);
        }
        debug!(game = %game, owner, events = timeline.len(), "replaced timeline");
    }

    /// Returns the timelines of a game.
    pub fn game(&self, game: &GameKey) -> Option<&GameTimelines> {
        self.games.get(game)
    }

    /// Returns one reporter's timeline for a game.
    pub fn timeline(&self, game: &GameKey, owner: &str) -> Option<&Timeline> {
        self.games.get(game)?.get(owner)
    }

    /// Returns true if any timeline exists for the game.
    pub fn has_game(&self, game: &GameKey) -> bool {
        self.games.contains_key(game)
    }

    /// Drops every timeline.
    pub fn clear(&mut self) {
        self.games.clear();
    }
}
