// Gameplay tuning. Keep this separate from runtime/server configuration
// (ports, channel sizes, tick cadence).

pub mod arena;
pub mod economy;
pub mod matches;
pub mod sides;
pub mod spawn;

pub use arena::{ArenaBounds, GameMode};
pub use economy::EconomyTuning;
pub use matches::MatchTuning;
pub use sides::{SideSpec, SideTable, TuningError, MAX_SIDES, MIN_SIDES};
pub use spawn::SpawnTuning;

/// Everything a room needs to run its simulation. Shared read-only by all rooms.
#[derive(Debug, Clone)]
pub struct Rules {
    pub sides: SideTable,
    pub arena: ArenaBounds,
    pub economy: EconomyTuning,
    pub spawn: SpawnTuning,
    pub matches: MatchTuning,
    pub mode: GameMode,
}

impl Rules {
    pub fn for_mode(mode: GameMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Checks the tables once at startup so per-tick lookups can rely on them.
    pub fn validate(&self) -> Result<(), TuningError> {
        self.sides.validate()
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            sides: SideTable::default(),
            arena: ArenaBounds::default(),
            economy: EconomyTuning::default(),
            spawn: SpawnTuning::default(),
            matches: MatchTuning::default(),
            mode: GameMode::Classic,
        }
    }
}
