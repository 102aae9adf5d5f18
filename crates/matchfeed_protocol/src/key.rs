//! Canonical game keys.
//!
//! Users type game names freely ("Germany Japan", "germany_japan",
//! "Germany-Japan"). Every per-game lookup goes through [`normalize`] so that
//! all spellings land on the same [`GameKey`].

use std::fmt;

/// Characters that separate words in a game name.
fn is_separator(c: char) -> bool {
    matches!(c, '_' | '-' | '/') || c.is_whitespace()
}

/// Normalizes a raw game name into its canonical form.
///
/// Alphanumerics are kept and lowercased, runs of separators (`_`, `-`, `/`,
/// whitespace) collapse into a single `_`, leading and trailing separators
/// are dropped and every other character is removed. The function is total
/// and idempotent.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for c in raw.chars() {
        if c.is_alphanumeric() {
            for lower in c.to_lowercase().filter(|l| l.is_alphanumeric()) {
                if pending_separator && !out.is_empty() {
                    out.push('_');
                }
                pending_separator = false;
                out.push(lower);
            }
        } else if is_separator(c) {
            pending_separator = true;
        }
    }

    out
}

/// Pretty-prints a canonical key for display.
///
/// The first letter of every `_`-separated word is uppercased and the rest
/// lowercased: `germany_japan` becomes `Germany_Japan`.
pub fn pretty_print(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// A canonical game identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameKey(String);

impl GameKey {
    /// Builds the key for a raw game name.
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    /// Builds the key for a match between two teams.
    pub fn for_teams(team_a: &str, team_b: &str) -> Self {
        Self::new(&format!("{team_a}_{team_b}"))
    }

    /// Returns the canonical string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the raw name contained no alphanumerics.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the display form of the key.
    pub fn pretty(&self) -> String {
        pretty_print(&self.0)
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
