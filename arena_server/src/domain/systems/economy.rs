use crate::domain::commands::Placement;
use crate::domain::errors::{CommandError, PlacementRejection};
use crate::domain::events::RoomEvent;
use crate::domain::geometry::{Vec2, circles_overlap, distance};
use crate::domain::ids::UnitId;
use crate::domain::state::{Player, RoomState};
use crate::domain::units::{SpawnState, Unit, UnitKind, UnitRole, UnitSnapshot};
use rand::Rng;
use tracing::debug;

/// True when a circle at `pos` touches no unit in the room, friend or foe.
pub(crate) fn is_free(state: &RoomState, pos: Vec2, size: f32) -> bool {
    let owned = state.players.values().flat_map(|p| p.units.iter());
    !owned
        .chain(state.hostiles.iter())
        .any(|u| circles_overlap(pos, size, u.pos, u.size))
}

fn charge(player: &Player, requested: u32, table_cost: u32) -> Result<u32, CommandError> {
    // Clients quote a price, but never below the table.
    let required = requested.max(table_cost);
    let available = player.spendable();
    if available < u64::from(required) {
        return Err(CommandError::InsufficientResources {
            required,
            available,
        });
    }
    Ok(required)
}

/// Places a new producer or combat unit for `player_id`.
pub fn place_unit(
    state: &mut RoomState,
    player_id: &str,
    placement: Placement,
) -> Result<UnitId, CommandError> {
    let Placement {
        pos, sides, role, cost, ..
    } = placement;

    if !matches!(role, UnitRole::Producer | UnitRole::Combat) {
        return Err(CommandError::InvalidRole(role));
    }
    let spec = state
        .rules
        .sides
        .get(sides)
        .ok_or(CommandError::InvalidPlacement(PlacementRejection::InvalidSides))?
        .clone();
    if !pos.is_finite() || !state.rules.arena.contains(pos) {
        return Err(CommandError::InvalidPlacement(PlacementRejection::OutOfBounds));
    }
    if !is_free(state, pos, spec.size) {
        return Err(CommandError::InvalidPlacement(PlacementRejection::Overlap));
    }

    let radius = state.rules.mode.placement_radius();
    let now = state.clock;
    let interval = state.rules.spawn.fighter_interval;
    let player = state
        .players
        .get_mut(player_id)
        .ok_or(CommandError::RoomNotFound)?;

    if let Some(radius) = radius {
        let in_range = player.units.iter().any(|u| distance(u.pos, pos) <= radius);
        if !player.units.is_empty() && !in_range {
            return Err(CommandError::InvalidPlacement(PlacementRejection::OutOfRange));
        }
    }
    let price = charge(player, cost, spec.cost)?;

    let unit = match role {
        UnitRole::Combat => Unit::combat(
            player_id.to_string(),
            pos,
            &spec,
            SpawnState::new(now, interval),
        ),
        _ => Unit::producer(player_id.to_string(), pos, &spec),
    };
    let unit_id = unit.id;
    let snapshot = UnitSnapshot::from(&unit);
    player.resources -= f64::from(price);
    player.units.push(unit);
    let resources = player.resources;

    debug!(player_id, unit_id = %unit_id, sides, role = %role, price, "unit placed");
    state.emit(RoomEvent::UnitPlaced {
        unit: snapshot,
        resources,
    });
    Ok(unit_id)
}

/// Pays for a copy of one of the caller's units, dropped next to the original.
pub fn replicate_unit(
    state: &mut RoomState,
    player_id: &str,
    source_id: UnitId,
    cost: u32,
) -> Result<UnitId, CommandError> {
    let jitter = state.rules.economy.replicate_jitter;
    let arena = state.rules.arena;
    let now = state.clock;

    let player = state
        .players
        .get_mut(player_id)
        .ok_or(CommandError::RoomNotFound)?;
    let source = player
        .unit(source_id)
        .ok_or(CommandError::UnitNotFound(source_id))?;
    let price = charge(player, cost, state.rules.sides.spec(source.sides).cost)?;

    let offset = Vec2::new(
        state.rng.random_range(-jitter..=jitter),
        state.rng.random_range(-jitter..=jitter),
    );
    let copy = source.replica(arena.clamp(source.pos + offset), now);
    let unit_id = copy.id;
    let snapshot = UnitSnapshot::from(&copy);
    player.resources -= f64::from(price);
    player.units.push(copy);
    let resources = player.resources;

    debug!(player_id, source_id = %source_id, unit_id = %unit_id, price, "unit replicated");
    state.emit(RoomEvent::UnitReplicated {
        unit: snapshot,
        source_id,
        resources,
    });
    Ok(unit_id)
}

/// Producers pay out on a lucky tick. Fractions carry over.
pub fn accrue_resources(state: &mut RoomState) {
    let economy = state.rules.economy;
    if !state.rng.random_bool(economy.accrual_chance) || state.players.is_empty() {
        return;
    }

    let mut balances = Vec::with_capacity(state.players.len());
    for (player_id, player) in state.players.iter_mut() {
        let income: f64 = player
            .units
            .iter()
            .filter(|u| matches!(u.kind, UnitKind::Producer))
            .map(|u| f64::from(u.size) / economy.producer_size_divisor)
            .sum();
        player.resources += income;
        balances.push((player_id.clone(), player.resources));
    }
    state.emit(RoomEvent::ResourcesUpdated { balances });
}
