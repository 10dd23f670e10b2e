// Hostile arrivals, fighter launches, fighter culling and starting units.

use crate::domain::errors::CommandError;
use crate::domain::events::{RemovalCause, RoomEvent};
use crate::domain::geometry::Vec2;
use crate::domain::ids::UnitId;
use crate::domain::state::RoomState;
use crate::domain::tuning::{ArenaBounds, MAX_SIDES, MIN_SIDES, Rules};
use crate::domain::units::{Unit, UnitKind, UnitRole, UnitSnapshot};
use rand::Rng;
use std::collections::HashSet;
use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const STARTING_UNIT_ATTEMPTS: usize = 20;

/// Uniform random point inside the arena.
pub fn random_point_in<R: Rng + ?Sized>(rng: &mut R, arena: &ArenaBounds) -> Vec2 {
    Vec2::new(
        rng.random_range(arena.min_x..=arena.max_x),
        rng.random_range(arena.min_y..=arena.max_y),
    )
}

fn roaming_hostiles(state: &RoomState) -> usize {
    state
        .hostiles
        .iter()
        .filter(|u| matches!(u.kind, UnitKind::Hostile))
        .count()
}

/// Rolls for a new roaming hostile entering from beyond the right edge.
pub fn maybe_spawn_hostile(state: &mut RoomState) -> Option<UnitId> {
    let rules = Arc::clone(&state.rules);
    let spawn = rules.spawn;
    let arena = rules.arena;

    // Always roll so the random stream doesn't depend on the hostile count.
    let hit = state.rng.random_bool(spawn.hostile_chance);
    if !hit || roaming_hostiles(state) >= spawn.hostile_cap {
        return None;
    }

    let sides = state.rng.random_range(MIN_SIDES..=MAX_SIDES);
    let pos = Vec2::new(
        state
            .rng
            .random_range(arena.max_x..=arena.max_x + spawn.hostile_entry_depth),
        state.rng.random_range(arena.min_y..=arena.max_y),
    );
    let target = random_point_in(&mut state.rng, &arena);
    let hostile = Unit::hostile(pos, target, rules.sides.spec(sides), spawn.hostile_speed_factor);
    let id = hostile.id;

    debug!(room_id = %state.id, unit_id = %id, sides, "hostile spawned");
    state.emit(RoomEvent::HostileSpawned(UnitSnapshot::from(&hostile)));
    state.hostiles.push(hostile);
    Some(id)
}

/// Builds a fighter for `parent` and restarts its spawn timer.
///
/// Returns `None` for anything that isn't a combat unit below its fighter cap.
fn launch_from<R: Rng + ?Sized>(
    parent: &mut Unit,
    rng: &mut R,
    rules: &Rules,
    now: Duration,
) -> Option<Unit> {
    let cfg = rules.spawn;
    let UnitKind::Combat(spawn) = &parent.kind else {
        return None;
    };
    if spawn.fighters.len() >= cfg.max_fighters_per_unit {
        return None;
    }

    let angle = rng.random_range(0.0..TAU);
    let reach = rng.random_range(0.0..=cfg.fighter_aim_radius);
    let target = parent.pos + Vec2::from_angle(angle) * reach;
    let fighter = Unit::fighter(
        parent,
        target,
        rules.sides.spec(parent.sides),
        cfg.fighter_size_factor,
        cfg.fighter_speed_factor,
    );

    if let UnitKind::Combat(spawn) = &mut parent.kind {
        spawn.last_spawn_at = now;
        spawn.fighters.push(fighter.id);
    }
    Some(fighter)
}

/// Launches a fighter from every combat unit whose timer has run out.
pub fn spawn_due_fighters(state: &mut RoomState) {
    let rules = Arc::clone(&state.rules);
    let now = state.clock;
    let mut launched = Vec::new();

    for player in state.players.values_mut() {
        for unit in &mut player.units {
            let due = matches!(&unit.kind, UnitKind::Combat(spawn) if spawn.is_due(now));
            if !due {
                continue;
            }
            if let Some(fighter) = launch_from(unit, &mut state.rng, &rules, now) {
                launched.push(fighter);
            }
        }
    }

    for fighter in launched {
        state.emit(RoomEvent::FighterSpawned(UnitSnapshot::from(&fighter)));
        state.hostiles.push(fighter);
    }
}

/// Launches a fighter on request, ignoring the timer but not the cap.
pub fn launch_fighter(
    state: &mut RoomState,
    player_id: &str,
    unit_id: UnitId,
) -> Result<UnitId, CommandError> {
    let rules = Arc::clone(&state.rules);
    let now = state.clock;

    let parent = state
        .players
        .get_mut(player_id)
        .and_then(|p| p.unit_mut(unit_id))
        .ok_or(CommandError::UnitNotFound(unit_id))?;
    let role = parent.role();
    if role != UnitRole::Combat {
        return Err(CommandError::InvalidRole(role));
    }
    let fighter = launch_from(parent, &mut state.rng, &rules, now)
        .ok_or(CommandError::FighterLimitReached(unit_id))?;
    let fighter_id = fighter.id;

    debug!(player_id, unit_id = %unit_id, fighter_id = %fighter_id, "fighter launched");
    state.emit(RoomEvent::FighterSpawned(UnitSnapshot::from(&fighter)));
    state.hostiles.push(fighter);
    Ok(fighter_id)
}

/// Removes fighters that have flown too far outside the arena.
pub fn cull_fighters(state: &mut RoomState) {
    let arena = state.rules.arena;
    let limit = state.rules.spawn.fighter_cull_distance;

    let mut culled = Vec::new();
    state.hostiles.retain(|u| {
        let gone = u.is_fighter() && arena.distance_outside(u.pos) > limit;
        if gone {
            culled.push(RoomEvent::UnitRemoved {
                unit_id: u.id,
                owner_id: u.owner.clone(),
                cause: RemovalCause::OutOfBounds,
            });
        }
        !gone
    });

    if culled.is_empty() {
        return;
    }
    prune_fighter_rosters(state);
    for event in culled {
        state.emit(event);
    }
}

/// Drops fighter ids from spawn rosters once the fighter itself is gone.
pub fn prune_fighter_rosters(state: &mut RoomState) {
    let alive: HashSet<UnitId> = state
        .hostiles
        .iter()
        .filter(|u| u.is_fighter())
        .map(|u| u.id)
        .collect();

    for player in state.players.values_mut() {
        for unit in &mut player.units {
            if let UnitKind::Combat(spawn) = &mut unit.kind {
                spawn.fighters.retain(|id| alive.contains(id));
            }
        }
    }
}

/// Hands a free producer to `player_id` when the game mode has one.
///
/// Tries a few random free spots before falling back to the arena center.
pub fn grant_starting_unit(state: &mut RoomState, player_id: &str) {
    let rules = Arc::clone(&state.rules);
    let Some(sides) = rules.mode.starting_unit_sides() else {
        return;
    };
    let spec = rules.sides.spec(sides);

    let mut pos = rules.arena.center();
    for _ in 0..STARTING_UNIT_ATTEMPTS {
        let candidate = random_point_in(&mut state.rng, &rules.arena);
        if super::economy::is_free(state, candidate, spec.size) {
            pos = candidate;
            break;
        }
    }

    if let Some(player) = state.players.get_mut(player_id) {
        player
            .units
            .push(Unit::producer(player_id.to_string(), pos, spec));
    }
}

/// Per-tick spawner pass: arrivals, timed launches, then culling.
pub fn tick_spawner(state: &mut RoomState) {
    maybe_spawn_hostile(state);
    spawn_due_fighters(state);
    cull_fighters(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::units::SpawnState;

    fn room_with(rules: Rules) -> RoomState {
        let mut room = RoomState::new(Arc::from("SPAWN"), Arc::new(rules), 99);
        room.join("p1");
        room.drain_events();
        room
    }

    fn add_combat(room: &mut RoomState, sides: u8, pos: Vec2) -> UnitId {
        let spec = room.rules.sides.spec(sides).clone();
        let spawn = SpawnState::new(room.clock, room.rules.spawn.fighter_interval);
        let unit = Unit::combat("p1".to_string(), pos, &spec, spawn);
        let id = unit.id;
        room.players
            .get_mut("p1")
            .expect("p1 joined")
            .units
            .push(unit);
        id
    }

    fn roster(room: &RoomState, unit_id: UnitId) -> Vec<UnitId> {
        match &room.players["p1"].unit(unit_id).expect("unit exists").kind {
            UnitKind::Combat(spawn) => spawn.fighters.clone(),
            other => panic!("expected combat unit, got {other:?}"),
        }
    }

    #[test]
    fn when_hostile_spawns_then_it_enters_from_the_right_inside_cap() {
        let mut rules = Rules::default();
        rules.spawn.hostile_chance = 1.0;
        rules.spawn.hostile_cap = 3;
        let mut room = room_with(rules);

        for _ in 0..10 {
            maybe_spawn_hostile(&mut room);
        }

        assert_eq!(room.hostiles.len(), 3);
        for hostile in &room.hostiles {
            assert!(hostile.owner.is_none());
            assert!((3..=9).contains(&hostile.sides));
            assert!(hostile.pos.x >= 500.0 && hostile.pos.x <= 600.0);
            let target = hostile.target.expect("hostiles always roam");
            assert!(room.rules.arena.contains(target));
        }
        let spawned = room
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, RoomEvent::HostileSpawned(_)))
            .count();
        assert_eq!(spawned, 3);
    }

    #[test]
    fn when_spawn_timer_is_due_then_one_fighter_launches() {
        let mut room = room_with(Rules::default());
        let parent = add_combat(&mut room, 6, Vec2::new(0.0, 0.0));

        room.clock = Duration::from_millis(4_900);
        spawn_due_fighters(&mut room);
        assert!(room.hostiles.is_empty());

        room.clock = Duration::from_secs(5);
        spawn_due_fighters(&mut room);

        assert_eq!(room.hostiles.len(), 1);
        let fighter = &room.hostiles[0];
        assert_eq!(fighter.sides, 6);
        assert!(fighter.is_owned_by("p1"));
        assert!((fighter.size - 35.0 * 0.375).abs() < 1e-4);
        assert!(matches!(fighter.kind, UnitKind::Fighter { parent_id } if parent_id == parent));
        let target = fighter.target.expect("fighters fly somewhere");
        assert!(target.length() <= 100.0 + 1e-3);
        assert_eq!(roster(&room, parent), vec![fighter.id]);

        // Timer restarted: nothing more this tick.
        spawn_due_fighters(&mut room);
        assert_eq!(room.hostiles.len(), 1);
    }

    #[test]
    fn when_producer_is_asked_for_a_fighter_then_invalid_role() {
        let mut room = room_with(Rules::default());
        let spec = room.rules.sides.spec(3).clone();
        let producer = Unit::producer("p1".to_string(), Vec2::new(0.0, 0.0), &spec);
        let id = producer.id;
        room.players.get_mut("p1").expect("p1").units.push(producer);

        assert_eq!(
            launch_fighter(&mut room, "p1", id),
            Err(CommandError::InvalidRole(UnitRole::Producer))
        );
        room.clock = Duration::from_secs(60);
        spawn_due_fighters(&mut room);
        assert!(room.hostiles.is_empty());
    }

    #[test]
    fn when_fighter_cap_is_reached_then_launch_is_refused() {
        let mut room = room_with(Rules::default());
        let parent = add_combat(&mut room, 4, Vec2::new(0.0, 0.0));

        for _ in 0..5 {
            launch_fighter(&mut room, "p1", parent).expect("below cap");
        }
        assert_eq!(
            launch_fighter(&mut room, "p1", parent),
            Err(CommandError::FighterLimitReached(parent))
        );
        assert_eq!(roster(&room, parent).len(), 5);
    }

    #[test]
    fn when_launching_from_unknown_unit_then_unit_not_found() {
        let mut room = room_with(Rules::default());
        assert_eq!(
            launch_fighter(&mut room, "p1", UnitId(42)),
            Err(CommandError::UnitNotFound(UnitId(42)))
        );
    }

    #[test]
    fn when_fighter_strays_far_outside_then_it_is_culled_and_roster_freed() {
        let mut room = room_with(Rules::default());
        let parent = add_combat(&mut room, 4, Vec2::new(0.0, 0.0));
        let fighter = launch_fighter(&mut room, "p1", parent).expect("launch");
        room.drain_events();

        if let Some(f) = room.hostiles.iter_mut().find(|u| u.id == fighter) {
            f.pos = Vec2::new(1_600.0, 0.0);
        }
        cull_fighters(&mut room);

        assert!(room.hostiles.is_empty());
        assert!(roster(&room, parent).is_empty());
        assert!(matches!(
            room.drain_events().as_slice(),
            [RoomEvent::UnitRemoved { unit_id, cause: RemovalCause::OutOfBounds, .. }]
                if *unit_id == fighter
        ));
    }

    #[test]
    fn when_fighter_is_just_outside_then_it_survives() {
        let mut room = room_with(Rules::default());
        let parent = add_combat(&mut room, 4, Vec2::new(0.0, 0.0));
        let fighter = launch_fighter(&mut room, "p1", parent).expect("launch");
        if let Some(f) = room.hostiles.iter_mut().find(|u| u.id == fighter) {
            f.pos = Vec2::new(1_400.0, 0.0);
        }
        cull_fighters(&mut room);
        assert_eq!(room.hostiles.len(), 1);
    }

    #[test]
    fn when_classic_player_joins_then_no_unit_is_granted() {
        let room = room_with(Rules::default());
        assert!(room.players["p1"].units.is_empty());
    }
}
