// Authoritative per-room state and the tick that advances it.

use super::commands::{Intent, validate_display_name};
use super::errors::{CommandError, InvariantViolation};
use super::events::{RemovalCause, RoomEvent};
use super::ids::{PlayerId, UnitId};
use super::systems::{combat, economy, lifecycle, movement, spawner};
use super::tuning::{GameMode, MAX_SIDES, MIN_SIDES, Rules};
use super::units::{Unit, UnitSnapshot};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

pub const PLAYER_COLORS: [&str; 8] = [
    "#FF5733", "#33FF57", "#3357FF", "#F033FF", "#FF33A1", "#33FFF6", "#BFFF33", "#FFD700",
];

pub const DEFAULT_PLAYER_NAME: &str = "Player";

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: &'static str,
    /// Fractional; only the floor can be spent.
    pub resources: f64,
    pub units: Vec<Unit>,
}

impl Player {
    pub fn new(id: PlayerId, color: &'static str, resources: f64) -> Self {
        Self {
            id,
            name: DEFAULT_PLAYER_NAME.to_string(),
            color,
            resources,
            units: Vec::new(),
        }
    }

    pub fn spendable(&self) -> u64 {
        self.resources.floor().max(0.0) as u64
    }

    pub fn unit(&self, unit_id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    pub fn unit_mut(&mut self, unit_id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == unit_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchPhase {
    Active,
    /// Scores are in; the room resets itself once the clock reaches `restart_at`.
    Finished {
        ended_at: Duration,
        restart_at: Duration,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub color: &'static str,
    pub score: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub match_number: u64,
    pub ended_at: Duration,
    pub leaders: Vec<ScoreEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub color: &'static str,
    pub resources: f64,
    pub units: Vec<UnitSnapshot>,
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            color: p.color,
            resources: p.resources,
            units: p.units.iter().map(UnitSnapshot::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub room_id: Arc<str>,
    pub tick: u64,
    pub clock: Duration,
    pub started_at: Duration,
    pub match_duration: Duration,
    pub match_number: u64,
    pub finished: bool,
    pub restart_at: Option<Duration>,
    pub mode: GameMode,
    pub side_table_version: u32,
    pub players: Vec<PlayerSnapshot>,
    pub hostiles: Vec<UnitSnapshot>,
    pub history: Vec<HistoryEntry>,
}

/// One match. Owned and mutated by exactly one room worker.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub id: Arc<str>,
    // Ordered so every per-tick pass visits players the same way.
    pub players: BTreeMap<PlayerId, Player>,
    /// Roaming hostiles and fighters, in spawn order.
    pub hostiles: Vec<Unit>,
    pub clock: Duration,
    pub started_at: Duration,
    pub last_tick_at: Duration,
    pub phase: MatchPhase,
    pub tick: u64,
    pub match_number: u64,
    pub history: VecDeque<HistoryEntry>,
    pub(crate) rules: Arc<Rules>,
    pub(crate) rng: Pcg64Mcg,
    events: Vec<RoomEvent>,
}

impl RoomState {
    pub fn new(id: Arc<str>, rules: Arc<Rules>, seed: u64) -> Self {
        Self {
            id,
            players: BTreeMap::new(),
            hostiles: Vec::new(),
            clock: Duration::ZERO,
            started_at: Duration::ZERO,
            last_tick_at: Duration::ZERO,
            phase: MatchPhase::Active,
            tick: 0,
            match_number: 1,
            history: VecDeque::new(),
            rules,
            rng: Pcg64Mcg::seed_from_u64(seed),
            events: Vec::new(),
        }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, MatchPhase::Finished { .. })
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub(crate) fn emit(&mut self, event: RoomEvent) {
        self.events.push(event);
    }

    /// Takes the events produced since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<RoomEvent> {
        std::mem::take(&mut self.events)
    }

    /// Adds a player with starting resources (and a starting unit in outpost mode).
    ///
    /// Joining twice with the same id is idempotent.
    pub fn join(&mut self, player_id: &str) -> RoomSnapshot {
        if !self.players.contains_key(player_id) {
            let color = PLAYER_COLORS[self.rng.random_range(0..PLAYER_COLORS.len())];
            let player = Player::new(
                player_id.to_string(),
                color,
                self.rules.economy.starting_resources,
            );
            self.players.insert(player_id.to_string(), player);
            spawner::grant_starting_unit(self, player_id);

            if let Some(player) = self.players.get(player_id) {
                let joined = RoomEvent::PlayerJoined(PlayerSnapshot::from(player));
                self.emit(joined);
            }
        }
        self.snapshot()
    }

    /// Removes a player, their units and their fighters. Returns false if absent.
    pub fn leave(&mut self, player_id: &str) -> bool {
        let Some(player) = self.players.remove(player_id) else {
            return false;
        };
        let mut removed: Vec<UnitId> = player.units.iter().map(|u| u.id).collect();
        self.hostiles.retain(|u| {
            let owned = u.is_owned_by(player_id);
            if owned {
                removed.push(u.id);
            }
            !owned
        });
        for unit_id in removed {
            self.emit(RoomEvent::UnitRemoved {
                unit_id,
                owner_id: Some(player_id.to_string()),
                cause: RemovalCause::OwnerLeft,
            });
        }
        self.emit(RoomEvent::PlayerLeft {
            player_id: player_id.to_string(),
        });
        true
    }

    /// Applies one validated player intent. On error nothing has changed.
    pub fn apply(&mut self, player_id: &str, intent: Intent) -> Result<(), CommandError> {
        if !self.players.contains_key(player_id) {
            return Err(CommandError::RoomNotFound);
        }
        if intent.is_gameplay() && self.is_finished() {
            return Err(CommandError::MatchFinished);
        }

        match intent {
            Intent::PlaceUnit(placement) => {
                economy::place_unit(self, player_id, placement).map(|_| ())
            }
            Intent::MoveUnit { unit_id, target } => {
                movement::move_unit(self, player_id, unit_id, target)
            }
            Intent::ReplicateUnit { unit_id, cost } => {
                economy::replicate_unit(self, player_id, unit_id, cost).map(|_| ())
            }
            Intent::SpawnFighter { unit_id } => {
                spawner::launch_fighter(self, player_id, unit_id).map(|_| ())
            }
            Intent::SetName { name } => {
                let name = validate_display_name(&name)?;
                if let Some(player) = self.players.get_mut(player_id) {
                    player.name = name.clone();
                }
                self.emit(RoomEvent::PlayerRenamed {
                    player_id: player_id.to_string(),
                    name,
                });
                Ok(())
            }
        }
    }

    /// Advances the simulation by one fixed step.
    ///
    /// Order matters: units move, then collide at their new positions, then the
    /// economy and spawner run, then the match clock is checked.
    pub fn step(&mut self, dt: Duration) {
        self.tick += 1;
        self.clock += dt;

        if !self.is_finished() {
            movement::tick_movement(self);
            combat::resolve_collisions(self);
            economy::accrue_resources(self);
            spawner::tick_spawner(self);
        }
        lifecycle::tick_lifecycle(self);

        self.last_tick_at = self.clock;
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let restart_at = match self.phase {
            MatchPhase::Active => None,
            MatchPhase::Finished { restart_at, .. } => Some(restart_at),
        };
        RoomSnapshot {
            room_id: self.id.clone(),
            tick: self.tick,
            clock: self.clock,
            started_at: self.started_at,
            match_duration: self.rules.matches.duration,
            match_number: self.match_number,
            finished: self.is_finished(),
            restart_at,
            mode: self.rules.mode,
            side_table_version: self.rules.sides.version,
            players: self.players.values().map(PlayerSnapshot::from).collect(),
            hostiles: self.hostiles.iter().map(UnitSnapshot::from).collect(),
            history: self.history.iter().cloned().collect(),
        }
    }

    /// Checks the invariants every completed tick must preserve.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen = HashSet::new();
        for (player_id, player) in &self.players {
            if !player.resources.is_finite() || player.resources < 0.0 {
                return Err(InvariantViolation::InvalidResources {
                    player_id: player_id.clone(),
                    resources: player.resources,
                });
            }
            for unit in &player.units {
                if !unit.is_owned_by(player_id) {
                    return Err(InvariantViolation::ForeignUnit {
                        unit_id: unit.id,
                        player_id: player_id.clone(),
                    });
                }
                check_unit(unit, &mut seen)?;
            }
        }
        for unit in &self.hostiles {
            check_unit(unit, &mut seen)?;
        }
        Ok(())
    }
}

fn check_unit(unit: &Unit, seen: &mut HashSet<UnitId>) -> Result<(), InvariantViolation> {
    if !(MIN_SIDES..=MAX_SIDES).contains(&unit.sides) {
        return Err(InvariantViolation::SidesOutOfRange(unit.id));
    }
    if !unit.pos.is_finite() {
        return Err(InvariantViolation::NonFinitePosition(unit.id));
    }
    if !seen.insert(unit.id) {
        return Err(InvariantViolation::DuplicateUnit(unit.id));
    }
    Ok(())
}
