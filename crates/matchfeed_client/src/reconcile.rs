//! Timeline reconciliation.
//!
//! Picks the timeline a summary should render. A reporter's own timeline is
//! used when it is complete; otherwise the richest complete timeline of
//! another reporter for the same game stands in for it.

use crate::store::{EventStore, Timeline};
use matchfeed_protocol::GameKey;
use tracing::debug;

/// Event-name markers a timeline must contain to be complete.
pub const REQUIRED_MARKERS: [&str; 4] = ["kickoff", "halftime", "goal", "final whistle"];

/// Returns true if every required marker appears, case-insensitively, as a
/// substring of some event name.
pub fn is_complete(timeline: &Timeline) -> bool {
    let names: Vec<String> = timeline
        .events()
        .iter()
        .map(|e| e.name.to_lowercase())
        .collect();

    REQUIRED_MARKERS
        .iter()
        .all(|marker| names.iter().any(|name| name.contains(marker)))
}

/// Richness of a timeline: update entries, description length and one per
/// named event.
pub fn detail_score(timeline: &Timeline) -> usize {
    timeline
        .events()
        .iter()
        .map(|e| e.update_count() + e.description.chars().count() + usize::from(!e.name.is_empty()))
        .sum()
}

/// How the rendered timeline was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The requested reporter's own timeline is complete.
    Own,
    /// Another reporter's complete timeline stands in.
    Fallback {
        /// Reporter whose timeline was chosen.
        owner: String,
    },
    /// Only the requested reporter's incomplete timeline exists.
    Incomplete,
    /// Nothing usable exists.
    Absent,
}

/// Result of reconciling a summary request.
#[derive(Debug, Clone)]
pub struct Reconciliation<'a> {
    /// Timeline to render, if any.
    pub timeline: Option<&'a Timeline>,
    /// How it was chosen.
    pub verdict: Verdict,
}

impl Reconciliation<'_> {
    /// Returns true if the chosen timeline may be rendered.
    pub fn is_complete(&self) -> bool {
        matches!(self.verdict, Verdict::Own | Verdict::Fallback { .. })
    }
}

/// Chooses the timeline to summarise for `target_user` in `game`.
pub fn reconcile<'a>(store: &'a EventStore, game: &GameKey, target_user: &str) -> Reconciliation<'a> {
    let Some(timelines) = store.game(game) else {
        return Reconciliation {
            timeline: None,
            verdict: Verdict::Absent,
        };
    };

    let own = timelines.get(target_user);
    if let Some(own) = own.filter(|t| is_complete(t)) {
        return Reconciliation {
            timeline: Some(own),
            verdict: Verdict::Own,
        };
    }

    let mut best: Option<(&Timeline, usize)> = None;
    for candidate in timelines.iter() {
        if candidate.owner() == target_user || !is_complete(candidate) {
            continue;
        }
        let score = detail_score(candidate);
        debug!(game = %game, owner = candidate.owner(), score, "fallback candidate");
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }

    if let Some((fallback, _)) = best {
        return Reconciliation {
            timeline: Some(fallback),
            verdict: Verdict::Fallback {
                owner: fallback.owner().to_string(),
            },
        };
    }

    match own {
        Some(own) => Reconciliation {
            timeline: Some(own),
            verdict: Verdict::Incomplete,
        },
        None => Reconciliation {
            timeline: None,
            verdict: Verdict::Absent,
        },
    }
}
