// Outbound state changes produced by commands and ticks.

use super::geometry::Vec2;
use super::ids::{PlayerId, UnitId};
use super::state::{HistoryEntry, PlayerSnapshot, RoomSnapshot, ScoreEntry};
use super::units::UnitSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Equal side counts collided.
    MutualDestruction,
    /// Lost a clash against the given unit.
    Defeated { by: UnitId },
    /// Fighter flew too far from the arena.
    OutOfBounds,
    /// Owner left the room.
    OwnerLeft,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    PlayerJoined(PlayerSnapshot),
    PlayerLeft {
        player_id: PlayerId,
    },
    PlayerRenamed {
        player_id: PlayerId,
        name: String,
    },
    UnitPlaced {
        unit: UnitSnapshot,
        resources: f64,
    },
    UnitMoved {
        unit_id: UnitId,
        owner_id: PlayerId,
        target: Vec2,
    },
    UnitReplicated {
        unit: UnitSnapshot,
        source_id: UnitId,
        resources: f64,
    },
    ResourcesUpdated {
        balances: Vec<(PlayerId, f64)>,
    },
    HostileSpawned(UnitSnapshot),
    FighterSpawned(UnitSnapshot),
    UnitRemoved {
        unit_id: UnitId,
        owner_id: Option<PlayerId>,
        cause: RemovalCause,
    },
    MatchEnded {
        scores: Vec<ScoreEntry>,
        history: Vec<HistoryEntry>,
    },
    MatchRestarted(RoomSnapshot),
}
