// Domain-level errors. Command rejections go back to the caller only.

use super::ids::{PlayerId, UnitId};
use super::units::UnitRole;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementRejection {
    #[error("overlaps an existing unit")]
    Overlap,
    #[error("too far from your other units")]
    OutOfRange,
    #[error("outside the arena")]
    OutOfBounds,
    #[error("side count must be between 3 and 9")]
    InvalidSides,
}

/// Expected, recoverable outcomes of a player command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("insufficient resources: need {required}, have {available}")]
    InsufficientResources { required: u32, available: u64 },
    #[error("invalid placement: {0}")]
    InvalidPlacement(PlacementRejection),
    #[error("unit {0} not found")]
    UnitNotFound(UnitId),
    #[error("unit id {0:?} is not valid")]
    InvalidUnitId(String),
    #[error("room not found")]
    RoomNotFound,
    #[error("{0} units cannot do that")]
    InvalidRole(UnitRole),
    #[error("unit {0} already has the maximum number of fighters")]
    FighterLimitReached(UnitId),
    #[error("the match has finished; wait for the restart")]
    MatchFinished,
    #[error("display name must be 3-32 letters, digits, spaces, '_' or '-'")]
    InvalidName,
    #[error("room id must be 1-32 letters, digits, '_' or '-'")]
    InvalidRoomId,
    #[error("target must be a finite position")]
    InvalidTarget,
}

impl CommandError {
    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientResources { .. } => "insufficient_resources",
            Self::InvalidPlacement(_) => "invalid_placement",
            Self::UnitNotFound(_) => "unit_not_found",
            Self::InvalidUnitId(_) => "invalid_unit_id",
            Self::RoomNotFound => "room_not_found",
            Self::InvalidRole(_) => "invalid_role",
            Self::FighterLimitReached(_) => "fighter_limit_reached",
            Self::MatchFinished => "match_finished",
            Self::InvalidName => "invalid_name",
            Self::InvalidRoomId => "invalid_room_id",
            Self::InvalidTarget => "invalid_target",
        }
    }
}

/// A state that a finished tick must never produce. Seeing one means a bug,
/// so the tick is discarded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("player {player_id} has invalid resources {resources}")]
    InvalidResources { player_id: PlayerId, resources: f64 },
    #[error("unit {0} has an out-of-range side count")]
    SidesOutOfRange(UnitId),
    #[error("unit {0} has a non-finite position")]
    NonFinitePosition(UnitId),
    #[error("unit id {0} appears more than once")]
    DuplicateUnit(UnitId),
    #[error("unit {unit_id} is listed under player {player_id} but owned by someone else")]
    ForeignUnit { unit_id: UnitId, player_id: PlayerId },
}
