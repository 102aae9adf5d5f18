//! Summary rendering.

use crate::error::{ClientError, ClientResult};
use crate::reconcile::Reconciliation;
use crate::store::Timeline;
use matchfeed_protocol::{GameEvent, UpdateMap};
use std::path::PathBuf;

/// Statistics aggregated over a timeline; later events win on key clashes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameStats {
    /// Game-wide stats.
    pub general: UpdateMap,
    /// First team stats.
    pub team_a: UpdateMap,
    /// Second team stats.
    pub team_b: UpdateMap,
}

impl GameStats {
    /// Folds the updates of `events`, in order.
    pub fn aggregate<'a>(events: impl IntoIterator<Item = &'a GameEvent>) -> Self {
        let mut stats = Self::default();
        for event in events {
            stats.general.extend(event.general_updates.clone());
            stats.team_a.extend(event.team_a_updates.clone());
            stats.team_b.extend(event.team_b_updates.clone());
        }
        stats
    }
}

/// Events sorted by time, then name.
pub fn chronological(timeline: &Timeline) -> Vec<&GameEvent> {
    let mut events: Vec<&GameEvent> = timeline.events().iter().collect();
    events.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.name.cmp(&b.name)));
    events
}

fn push_stats(out: &mut String, title: &str, stats: &UpdateMap) {
    out.push_str(title);
    out.push_str(" stats:\n");
    for (key, value) in stats {
        out.push_str(&format!("{key}: {value}\n"));
    }
}

/// Renders a timeline as a summary report.
pub fn render(timeline: &Timeline) -> String {
    let events = chronological(timeline);
    let (team_a, team_b) = events
        .first()
        .map(|e| (e.team_a.as_str(), e.team_b.as_str()))
        .unwrap_or_default();
    let stats = GameStats::aggregate(events.iter().copied());

    let mut out = format!("{team_a} vs {team_b}\nGame stats:\n");
    push_stats(&mut out, "General", &stats.general);
    push_stats(&mut out, team_a, &stats.team_a);
    push_stats(&mut out, team_b, &stats.team_b);

    out.push_str("Game event reports:\n");
    for event in events {
        out.push_str(&format!(
            "{} - {}:\n\n{}\n\n",
            event.time,
            event.name,
            event.description.trim()
        ));
    }
    out
}

/// A rendered summary waiting to be written.
///
/// The file is always created. It only receives content when the chosen
/// timeline is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryFile {
    /// Destination path.
    pub path: PathBuf,
    /// Rendered report, empty for an incomplete or missing timeline.
    pub contents: String,
}

impl SummaryFile {
    /// Renders the summary for a reconciliation.
    pub fn new(path: impl Into<PathBuf>, reconciliation: &Reconciliation<'_>) -> Self {
        let contents = match reconciliation.timeline {
            Some(timeline) if reconciliation.is_complete() => render(timeline),
            _ => String::new(),
        };
        Self {
            path: path.into(),
            contents,
        }
    }

    /// Returns true if no report will be written.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Writes the file, replacing any previous content.
    pub async fn write(&self) -> ClientResult<()> {
        tokio::fs::write(&self.path, &self.contents)
            .await
            .map_err(|source| ClientError::SummaryFile {
                path: self.path.clone(),
                source,
            })
    }
}
