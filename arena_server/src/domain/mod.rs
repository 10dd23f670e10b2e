// Domain layer: core simulation types and rules.

pub mod commands;
pub mod errors;
pub mod events;
pub mod geometry;
pub mod ids;
pub mod state;
pub mod systems;
pub mod tuning;
pub mod units;

pub use commands::{Intent, Placement};
pub use errors::{CommandError, InvariantViolation, PlacementRejection};
pub use events::{RemovalCause, RoomEvent};
pub use geometry::Vec2;
pub use ids::{PlayerId, UnitId};
pub use state::{
    HistoryEntry, MatchPhase, PlayerSnapshot, RoomSnapshot, RoomState, ScoreEntry,
};
pub use tuning::{GameMode, Rules};
pub use units::{Unit, UnitKind, UnitRole, UnitSnapshot};
