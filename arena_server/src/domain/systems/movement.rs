use crate::domain::errors::CommandError;
use crate::domain::events::RoomEvent;
use crate::domain::geometry::{Step, Vec2, contact_angle, step_toward};
use crate::domain::ids::UnitId;
use crate::domain::state::RoomState;
use crate::domain::tuning::Rules;
use crate::domain::units::{Unit, UnitKind};
use rand_pcg::Pcg64Mcg;
use std::sync::Arc;

use super::spawner::random_point_in;

/// Moves every unit with a target one step and spins everything a little.
pub fn tick_movement(state: &mut RoomState) {
    let rules = Arc::clone(&state.rules);
    let cfg = rules.spawn;

    for player in state.players.values_mut() {
        for unit in &mut player.units {
            if let Some(target) = unit.target {
                match step_toward(unit.pos, target, unit.speed, cfg.arrival_epsilon) {
                    Step::Moved(next) => unit.pos = next,
                    // Owned units stop once they get there.
                    Step::Arrived => unit.target = None,
                }
            }
            unit.rotation += cfg.rotation_per_tick;
        }
    }

    for unit in &mut state.hostiles {
        if let Some(target) = unit.target {
            match step_toward(unit.pos, target, unit.speed, cfg.arrival_epsilon) {
                Step::Moved(next) => unit.pos = next,
                Step::Arrived => {
                    unit.target = Some(next_target(unit, target, &mut state.rng, &rules));
                }
            }
        }
        unit.rotation += cfg.rotation_per_tick;
    }
}

fn next_target(unit: &Unit, reached: Vec2, rng: &mut Pcg64Mcg, rules: &Rules) -> Vec2 {
    match unit.kind {
        // Fighters never loiter: keep flying along the current heading.
        UnitKind::Fighter { .. } => {
            let heading = Vec2::from_angle(contact_angle(unit.pos, reached));
            unit.pos + heading * rules.spawn.fighter_overshoot
        }
        _ => random_point_in(rng, &rules.arena),
    }
}

/// Sets a new destination for one of the caller's units or fighters.
pub fn move_unit(
    state: &mut RoomState,
    player_id: &str,
    unit_id: UnitId,
    target: Vec2,
) -> Result<(), CommandError> {
    if !target.is_finite() {
        return Err(CommandError::InvalidTarget);
    }
    let target = state.rules.arena.clamp(target);

    let unit = state
        .players
        .get_mut(player_id)
        .and_then(|p| p.unit_mut(unit_id));
    let unit = match unit {
        Some(unit) => unit,
        None => state
            .hostiles
            .iter_mut()
            .find(|u| u.id == unit_id && u.is_fighter() && u.is_owned_by(player_id))
            .ok_or(CommandError::UnitNotFound(unit_id))?,
    };
    unit.target = Some(target);

    state.emit(RoomEvent::UnitMoved {
        unit_id,
        owner_id: player_id.to_string(),
        target,
    });
    Ok(())
}
