// Unit model shared by player polygons, roaming hostiles and fighters.

use super::geometry::Vec2;
use super::ids::{PlayerId, UnitId};
use super::tuning::SideSpec;
use std::fmt;
use std::time::Duration;

pub const HOSTILE_COLOR: &str = "#FF0000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRole {
    Producer,
    Combat,
    Hostile,
    Fighter,
}

impl UnitRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Combat => "combat",
            Self::Hostile => "hostile",
            Self::Fighter => "fighter",
        }
    }
}

impl fmt::Display for UnitRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fighter production bookkeeping carried only by combat units.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnState {
    /// Room-clock time of the last launch (or of placement).
    pub last_spawn_at: Duration,
    pub interval: Duration,
    /// Fighters launched by this unit that are still alive.
    pub fighters: Vec<UnitId>,
}

impl SpawnState {
    pub fn new(now: Duration, interval: Duration) -> Self {
        Self {
            last_spawn_at: now,
            interval,
            fighters: Vec::new(),
        }
    }

    pub fn is_due(&self, now: Duration) -> bool {
        self.last_spawn_at + self.interval <= now
    }
}

/// Role-specific state. Only combat units spawn, only fighters have a parent.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitKind {
    Producer,
    Combat(SpawnState),
    Hostile,
    Fighter { parent_id: UnitId },
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub pos: Vec2,
    pub sides: u8,
    /// Collision radius.
    pub size: f32,
    /// Distance per tick.
    pub speed: f32,
    pub color: &'static str,
    /// None for roaming hostiles.
    pub owner: Option<PlayerId>,
    // Render-only; advanced every tick but never read by gameplay.
    pub rotation: f32,
    pub target: Option<Vec2>,
    pub kind: UnitKind,
}

impl Unit {
    pub fn producer(owner: PlayerId, pos: Vec2, spec: &SideSpec) -> Self {
        Self::owned(owner, pos, spec, UnitKind::Producer)
    }

    pub fn combat(owner: PlayerId, pos: Vec2, spec: &SideSpec, spawn: SpawnState) -> Self {
        Self::owned(owner, pos, spec, UnitKind::Combat(spawn))
    }

    fn owned(owner: PlayerId, pos: Vec2, spec: &SideSpec, kind: UnitKind) -> Self {
        Self {
            id: UnitId::next(),
            pos,
            sides: spec.sides,
            size: spec.size,
            speed: spec.speed,
            color: spec.color,
            owner: Some(owner),
            rotation: 0.0,
            target: None,
            kind,
        }
    }

    pub fn hostile(pos: Vec2, target: Vec2, spec: &SideSpec, speed_factor: f32) -> Self {
        Self {
            id: UnitId::next(),
            pos,
            sides: spec.sides,
            size: spec.size,
            speed: spec.speed * speed_factor,
            color: HOSTILE_COLOR,
            owner: None,
            rotation: 0.0,
            target: Some(target),
            kind: UnitKind::Hostile,
        }
    }

    /// A scaled-down copy of `parent` that flies toward `target`.
    pub fn fighter(
        parent: &Unit,
        target: Vec2,
        spec: &SideSpec,
        size_factor: f32,
        speed_factor: f32,
    ) -> Self {
        Self {
            id: UnitId::next(),
            pos: parent.pos,
            sides: parent.sides,
            size: parent.size * size_factor,
            speed: spec.speed * speed_factor,
            color: parent.color,
            owner: parent.owner.clone(),
            rotation: parent.rotation,
            target: Some(target),
            kind: UnitKind::Fighter {
                parent_id: parent.id,
            },
        }
    }

    /// Fresh copy with a new id, no target and (for combat units) a reset spawn timer.
    pub fn replica(&self, pos: Vec2, now: Duration) -> Self {
        let kind = match &self.kind {
            UnitKind::Combat(spawn) => UnitKind::Combat(SpawnState::new(now, spawn.interval)),
            other => other.clone(),
        };
        Self {
            id: UnitId::next(),
            pos,
            rotation: 0.0,
            target: None,
            kind,
            owner: self.owner.clone(),
            ..*self
        }
    }

    pub fn role(&self) -> UnitRole {
        match self.kind {
            UnitKind::Producer => UnitRole::Producer,
            UnitKind::Combat(_) => UnitRole::Combat,
            UnitKind::Hostile => UnitRole::Hostile,
            UnitKind::Fighter { .. } => UnitRole::Fighter,
        }
    }

    pub fn is_fighter(&self) -> bool {
        matches!(self.kind, UnitKind::Fighter { .. })
    }

    pub fn is_owned_by(&self, player_id: &str) -> bool {
        self.owner.as_deref() == Some(player_id)
    }
}

/// Network-facing view of a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub owner_id: Option<PlayerId>,
    pub role: UnitRole,
    pub x: f32,
    pub y: f32,
    pub sides: u8,
    pub size: f32,
    pub color: &'static str,
    pub rotation: f32,
    pub target: Option<Vec2>,
    pub parent_id: Option<UnitId>,
    pub last_spawn_at: Option<Duration>,
}

impl From<&Unit> for UnitSnapshot {
    fn from(u: &Unit) -> Self {
        let (parent_id, last_spawn_at) = match &u.kind {
            UnitKind::Fighter { parent_id } => (Some(*parent_id), None),
            UnitKind::Combat(spawn) => (None, Some(spawn.last_spawn_at)),
            UnitKind::Producer | UnitKind::Hostile => (None, None),
        };
        Self {
            id: u.id,
            owner_id: u.owner.clone(),
            role: u.role(),
            x: u.pos.x,
            y: u.pos.y,
            sides: u.sides,
            size: u.size,
            color: u.color,
            rotation: u.rotation,
            target: u.target,
            parent_id,
            last_spawn_at,
        }
    }
}
