// Collision and combat resolution between owned units and the hostile side.

use crate::domain::events::{RemovalCause, RoomEvent};
use crate::domain::geometry::{Vec2, circles_overlap, reflect, separate};
use crate::domain::state::RoomState;
use crate::domain::units::Unit;
use tracing::debug;

use super::spawner::prune_fighter_rosters;

/// Outcome of two units touching, from the first unit's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clash {
    MutualDestruction,
    FirstWins,
    SecondWins,
    Bounce,
}

impl Clash {
    /// The same clash seen from the other unit.
    pub fn mirrored(self) -> Self {
        match self {
            Self::FirstWins => Self::SecondWins,
            Self::SecondWins => Self::FirstWins,
            other => other,
        }
    }
}

/// Equal sides destroy each other, exactly one extra side wins, anything else bounces.
pub fn clash(first_sides: u8, second_sides: u8) -> Clash {
    if first_sides == second_sides {
        Clash::MutualDestruction
    } else if first_sides == second_sides.saturating_add(1) {
        Clash::FirstWins
    } else if second_sides == first_sides.saturating_add(1) {
        Clash::SecondWins
    } else {
        Clash::Bounce
    }
}

/// Elastic bounce: separate the pair, then deflect any unit heading into the contact.
pub fn bounce(a: &mut Unit, b: &mut Unit) {
    // Coincident centers have no contact direction; order by id so the
    // result doesn't depend on argument order.
    if a.pos == b.pos && b.id < a.id {
        return bounce(b, a);
    }
    let normal = separate(&mut a.pos, a.size, &mut b.pos, b.size);
    deflect(a, normal);
    deflect(b, normal * -1.0);
}

fn deflect(unit: &mut Unit, toward_other: Vec2) {
    let Some(target) = unit.target else {
        return;
    };
    let heading = target - unit.pos;
    if heading.dot(toward_other) > 0.0 {
        unit.target = Some(unit.pos + reflect(heading, toward_other));
    }
}

enum Contact {
    Both,
    OwnedLost,
    HostileLost,
    Bounced,
}

/// Full pairwise scan of owned units against hostiles and fighters.
///
/// O(owned × hostile) per tick; players in id order, units and hostiles in list
/// order. A player's own fighters never hit that player's units.
pub fn resolve_collisions(state: &mut RoomState) {
    let bounty_per_side = state.rules.economy.bounty_per_side;
    let mut hostile_alive = vec![true; state.hostiles.len()];
    let mut events = Vec::new();

    for (player_id, player) in state.players.iter_mut() {
        let mut unit_alive = vec![true; player.units.len()];
        let mut bounty = 0.0;

        for (i, unit) in player.units.iter_mut().enumerate() {
            for (j, hostile) in state.hostiles.iter_mut().enumerate() {
                if !hostile_alive[j] || hostile.is_owned_by(player_id) {
                    continue;
                }
                if !circles_overlap(unit.pos, unit.size, hostile.pos, hostile.size) {
                    continue;
                }

                let contact = match clash(unit.sides, hostile.sides) {
                    Clash::MutualDestruction => Contact::Both,
                    Clash::FirstWins => Contact::HostileLost,
                    Clash::SecondWins => Contact::OwnedLost,
                    Clash::Bounce => {
                        bounce(unit, hostile);
                        Contact::Bounced
                    }
                };

                match contact {
                    Contact::Both => {
                        unit_alive[i] = false;
                        hostile_alive[j] = false;
                        events.push(removed(unit, RemovalCause::MutualDestruction));
                        events.push(removed(hostile, RemovalCause::MutualDestruction));
                    }
                    Contact::HostileLost => {
                        hostile_alive[j] = false;
                        bounty += f64::from(hostile.sides) * bounty_per_side;
                        events.push(removed(hostile, RemovalCause::Defeated { by: unit.id }));
                    }
                    Contact::OwnedLost => {
                        unit_alive[i] = false;
                        events.push(removed(unit, RemovalCause::Defeated { by: hostile.id }));
                    }
                    Contact::Bounced => {}
                }

                if !unit_alive[i] {
                    break;
                }
            }
        }

        if unit_alive.contains(&false) {
            let mut alive = unit_alive.into_iter();
            player.units.retain(|_| alive.next().unwrap_or(true));
        }
        if bounty > 0.0 {
            player.resources += bounty;
            debug!(player_id = %player_id, bounty, "hostile defeated");
            events.push(RoomEvent::ResourcesUpdated {
                balances: vec![(player_id.clone(), player.resources)],
            });
        }
    }

    if hostile_alive.contains(&false) {
        let mut alive = hostile_alive.into_iter();
        state.hostiles.retain(|_| alive.next().unwrap_or(true));
        prune_fighter_rosters(state);
    }
    for event in events {
        state.emit(event);
    }
}

fn removed(unit: &Unit, cause: RemovalCause) -> RoomEvent {
    RoomEvent::UnitRemoved {
        unit_id: unit.id,
        owner_id: unit.owner.clone(),
        cause,
    }
}
