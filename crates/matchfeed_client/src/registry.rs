//! Subscription registry.
//!
//! Maps canonical game keys to subscription ids and display destinations.
//! A game has at most one active subscription at a time.

use crate::error::{ClientError, ClientResult};
use matchfeed_protocol::GameKey;
use std::collections::HashMap;

/// An active subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Canonical game key.
    pub key: GameKey,
    /// Subscription id, unique while active.
    pub id: u64,
    /// Destination as sent to the server, e.g. `/Germany_Japan`.
    pub destination: String,
}

impl Subscription {
    /// Destination without its leading `/`, for user-facing messages.
    pub fn channel(&self) -> &str {
        self.destination.trim_start_matches('/')
    }
}

/// Result of [`SubscriptionRegistry::leave`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The subscription was removed.
    Unsubscribed(Subscription),
    /// No game was named: the whole session should log out.
    Logout,
}

/// Tracks the session's subscriptions.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    next_id: u64,
    by_key: HashMap<GameKey, Subscription>,
    by_id: HashMap<u64, GameKey>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to a game.
    ///
    /// Fails with [`ClientError::AlreadySubscribed`] when the game's canonical
    /// key already has a subscription; the existing mapping is left untouched.
    pub fn join(&mut self, raw_game: &str) -> ClientResult<Subscription> {
        let key = GameKey::new(raw_game);
        if key.is_empty() {
            return Err(ClientError::usage("join <game>"));
        }
        if let Some(existing) = self.by_key.get(&key) {
            return Err(ClientError::AlreadySubscribed(existing.channel().to_string()));
        }

        let id = self.next_id;
        self.next_id += 1;

        let subscription = Subscription {
            key: key.clone(),
            id,
            destination: format!("/{}", raw_game.trim()),
        };
        self.by_id.insert(id, key.clone());
        self.by_key.insert(key, subscription.clone());
        Ok(subscription)
    }

    /// Leaves a game, or signals a logout when `raw_game` is `None`.
    pub fn leave(&mut self, raw_game: Option<&str>) -> ClientResult<LeaveOutcome> {
        let Some(raw_game) = raw_game else {
            return Ok(LeaveOutcome::Logout);
        };

        let key = GameKey::new(raw_game);
        let subscription = self
            .by_key
            .remove(&key)
            .ok_or_else(|| ClientError::NotSubscribed(raw_game.trim().to_string()))?;
        self.by_id.remove(&subscription.id);
        Ok(LeaveOutcome::Unsubscribed(subscription))
    }

    /// Returns the subscription for a game.
    pub fn get(&self, key: &GameKey) -> Option<&Subscription> {
        self.by_key.get(key)
    }

    /// Returns the game subscribed under `id`.
    pub fn key_for_id(&self, id: u64) -> Option<&GameKey> {
        self.by_id.get(&id)
    }

    /// Returns true if the game has an active subscription.
    pub fn is_subscribed(&self, key: &GameKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Destination for a game: the recorded one, else the pretty-printed key.
    pub fn destination_for(&self, key: &GameKey) -> String {
        match self.by_key.get(key) {
            Some(subscription) => subscription.destination.clone(),
            None => format!("/{}", key.pretty()),
        }
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns true if there are no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Drops every subscription and restarts id allocation.
    pub fn clear(&mut self) {
        self.by_key.clear();
        self.by_id.clear();
        self.next_id = 0;
    }
}
