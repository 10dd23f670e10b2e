// Match clock: Active -> Finished -> (cooldown) -> Active, reset in place.

use crate::domain::events::RoomEvent;
use crate::domain::state::{HistoryEntry, MatchPhase, Player, RoomState, ScoreEntry};
use crate::domain::tuning::MatchTuning;
use crate::domain::units::UnitKind;
use tracing::info;

use super::spawner::grant_starting_unit;

/// Units weighted by role and side count, plus one point per 10 resources.
pub fn score(player: &Player, tuning: &MatchTuning) -> u64 {
    let units: u64 = player
        .units
        .iter()
        .map(|u| {
            let multiplier = match u.kind {
                UnitKind::Combat(_) => tuning.combat_multiplier,
                _ => tuning.producer_multiplier,
            };
            u64::from(u.sides) * multiplier
        })
        .sum();
    let banked = (player.resources / tuning.resources_per_point).floor().max(0.0) as u64;
    units + banked
}

/// Final standings, best first. Ties keep player id order.
pub fn compute_scores(state: &RoomState) -> Vec<ScoreEntry> {
    let tuning = &state.rules.matches;
    let mut scores: Vec<ScoreEntry> = state
        .players
        .values()
        .map(|p| ScoreEntry {
            player_id: p.id.clone(),
            name: p.name.clone(),
            color: p.color,
            score: score(p, tuning),
        })
        .collect();
    scores.sort_by(|a, b| b.score.cmp(&a.score));
    scores
}

/// Ends the match when its time is up, and resets it once the cooldown passes.
pub fn tick_lifecycle(state: &mut RoomState) {
    let tuning = state.rules.matches;
    match state.phase {
        MatchPhase::Active => {
            if state.clock.saturating_sub(state.started_at) >= tuning.duration {
                finish(state);
            }
        }
        MatchPhase::Finished { restart_at, .. } => {
            if state.clock >= restart_at {
                restart(state);
            }
        }
    }
}

fn finish(state: &mut RoomState) {
    let tuning = state.rules.matches;
    let scores = compute_scores(state);

    state.history.push_back(HistoryEntry {
        match_number: state.match_number,
        ended_at: state.clock,
        leaders: scores.iter().take(tuning.leaders_recorded).cloned().collect(),
    });
    while state.history.len() > tuning.history_len {
        state.history.pop_front();
    }
    state.phase = MatchPhase::Finished {
        ended_at: state.clock,
        restart_at: state.clock + tuning.restart_cooldown,
    };

    info!(
        room_id = %state.id,
        match_number = state.match_number,
        players = scores.len(),
        winner = scores.first().map(|s| s.player_id.as_str()).unwrap_or("-"),
        "match ended"
    );
    let history = state.history.iter().cloned().collect();
    state.emit(RoomEvent::MatchEnded { scores, history });
}

fn restart(state: &mut RoomState) {
    let starting = state.rules.economy.starting_resources;

    state.hostiles.clear();
    for player in state.players.values_mut() {
        player.resources = starting;
        player.units.clear();
    }
    let ids: Vec<String> = state.players.keys().cloned().collect();
    for player_id in &ids {
        grant_starting_unit(state, player_id);
    }

    state.started_at = state.clock;
    state.phase = MatchPhase::Active;
    state.match_number += 1;

    info!(room_id = %state.id, match_number = state.match_number, "match restarted");
    let snapshot = state.snapshot();
    state.emit(RoomEvent::MatchRestarted(snapshot));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commands::{Intent, Placement};
    use crate::domain::geometry::Vec2;
    use crate::domain::tuning::{GameMode, Rules};
    use crate::domain::units::{SpawnState, Unit, UnitRole};
    use std::sync::Arc;
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(100);

    fn room_with(rules: Rules) -> RoomState {
        RoomState::new(Arc::from("LIFE"), Arc::new(rules), 1234)
    }

    fn quiet_rules() -> Rules {
        let mut rules = Rules::default();
        rules.spawn.hostile_chance = 0.0;
        rules.economy.accrual_chance = 0.0;
        rules
    }

    #[test]
    fn when_player_has_units_and_savings_then_score_counts_both() {
        let rules = Rules::default();
        let mut player = Player::new("p1".to_string(), "#FFFFFF", 57.9);
        let spec = rules.sides.spec(3).clone();
        player
            .units
            .push(Unit::producer("p1".to_string(), Vec2::new(0.0, 0.0), &spec));
        let spec = rules.sides.spec(5).clone();
        let spawn = SpawnState::new(Duration::ZERO, rules.spawn.fighter_interval);
        player
            .units
            .push(Unit::combat("p1".to_string(), Vec2::new(90.0, 0.0), &spec, spawn));

        // 3*1 + 5*2 + floor(57.9 / 10)
        assert_eq!(score(&player, &rules.matches), 18);
    }

    #[test]
    fn when_scores_tie_then_player_id_breaks_the_tie() {
        let mut room = room_with(quiet_rules());
        room.join("zed");
        room.join("amy");
        room.join("bob");
        if let Some(p) = room.players.get_mut("bob") {
            p.resources = 200.0;
        }

        let order: Vec<_> = compute_scores(&room)
            .into_iter()
            .map(|s| s.player_id)
            .collect();
        assert_eq!(order, vec!["bob", "amy", "zed"]);
    }

    #[test]
    fn when_match_time_elapses_then_it_ends_and_restarts_once_after_cooldown() {
        let mut room = room_with(Rules::default());
        room.join("p1");
        room.join("p2");
        room.apply(
            "p1",
            Intent::PlaceUnit(Placement {
                pos: Vec2::new(100.0, 100.0),
                sides: 3,
                role: UnitRole::Producer,
                cost: 10,
                size_hint: Some(20.0),
            }),
        )
        .expect("placement succeeds");
        room.drain_events();

        // 5 minutes of 100 ms ticks.
        for _ in 0..2_999 {
            room.step(TICK);
        }
        assert!(!room.is_finished());
        room.step(TICK);
        assert!(room.is_finished());

        let events = room.drain_events();
        let ended: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                RoomEvent::MatchEnded { scores, history } => Some((scores, history)),
                _ => None,
            })
            .collect();
        assert_eq!(ended.len(), 1);
        let (scores, history) = ended[0];
        assert_eq!(scores.len(), 2);
        assert!(scores.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].match_number, 1);

        // Paused during cooldown: nothing moves, spawns or pays out.
        let hostiles_at_end = room.hostiles.len();
        for _ in 0..199 {
            room.step(TICK);
        }
        assert!(room.is_finished());
        assert_eq!(room.hostiles.len(), hostiles_at_end);
        assert!(room.drain_events().is_empty());

        room.step(TICK);
        assert!(!room.is_finished());
        assert!(room.hostiles.is_empty());
        for player in room.players.values() {
            assert_eq!(player.resources, 100.0);
            assert!(player.units.is_empty());
        }
        assert_eq!(room.match_number, 2);
        assert_eq!(room.started_at, Duration::from_secs(320));
        let events = room.drain_events();
        assert!(matches!(
            events.as_slice(),
            [RoomEvent::MatchRestarted(snapshot)] if snapshot.match_number == 2 && !snapshot.finished
        ));

        // The next match runs its own full length.
        room.step(TICK);
        assert!(!room.is_finished());
    }

    #[test]
    fn when_outpost_match_restarts_then_everyone_gets_a_fresh_producer() {
        let mut room = room_with(Rules::for_mode(GameMode::Outpost));
        room.join("p1");
        room.join("p2");
        room.phase = MatchPhase::Finished {
            ended_at: Duration::ZERO,
            restart_at: Duration::ZERO,
        };

        tick_lifecycle(&mut room);

        for player in room.players.values() {
            assert_eq!(player.units.len(), 1);
            assert_eq!(player.units[0].sides, 3);
            assert_eq!(player.units[0].role(), UnitRole::Producer);
        }
    }

    #[test]
    fn when_many_matches_end_then_history_keeps_the_last_five() {
        let mut rules = quiet_rules();
        rules.matches.duration = Duration::from_secs(1);
        rules.matches.restart_cooldown = Duration::from_secs(1);
        let mut room = room_with(rules);
        room.join("p1");

        for _ in 0..(7 * 20) {
            room.step(TICK);
        }

        assert_eq!(room.history.len(), 5);
        assert_eq!(room.history.back().map(|h| h.match_number), Some(7));
        assert_eq!(room.history.front().map(|h| h.match_number), Some(3));
        assert!(room.history.iter().all(|h| h.leaders.len() == 1));
    }
}
