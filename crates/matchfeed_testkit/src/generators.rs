//! Property-based test generators using proptest.

use matchfeed_protocol::GameEvent;
use proptest::prelude::*;

/// Strategy for team names, possibly with spaces and hyphens.
pub fn team_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{2,8}([ -][A-Z][a-z]{2,8})?").expect("Invalid regex")
}

/// Strategy for game names the way users type them: two teams joined by
/// one of the accepted separators, in any letter case.
pub fn game_name_strategy() -> impl Strategy<Value = String> {
    (
        team_name_strategy(),
        prop::sample::select(vec!["_", "-", " ", "/", "__"]),
        team_name_strategy(),
        any::<bool>(),
    )
        .prop_map(|(a, sep, b, upper)| {
            let name = format!("{a}{sep}{b}");
            if upper {
                name.to_uppercase()
            } else {
                name
            }
        })
}

/// Strategy for update maps entries.
pub fn update_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(
        (
            prop::string::string_regex("[a-z]{1,8}( [a-z]{1,8})?").expect("Invalid regex"),
            prop::string::string_regex("[a-z0-9%]{1,6}").expect("Invalid regex"),
        ),
        0..4,
    )
}

/// Strategy for game events between two fixed teams.
pub fn game_event_strategy(team_a: &str, team_b: &str) -> impl Strategy<Value = GameEvent> {
    let team_a = team_a.to_string();
    let team_b = team_b.to_string();
    (
        prop::sample::select(vec!["kickoff", "goal", "halftime", "final whistle", "yellow card"]),
        0i64..6000,
        update_strategy(),
        update_strategy(),
        prop::string::string_regex("[A-Za-z !,.]{0,40}").expect("Invalid regex"),
    )
        .prop_map(move |(name, time, general, team, description)| {
            let mut event = GameEvent::new(name, time)
                .with_teams(team_a.clone(), team_b.clone())
                .with_description(description);
            for (key, value) in general {
                event = event.with_general_update(key, value);
            }
            for (key, value) in team {
                event = event.with_team_a_update(key, value);
            }
            event
        })
}
