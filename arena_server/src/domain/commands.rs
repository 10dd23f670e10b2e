// Player intents as the simulation sees them, after wire decoding.

use super::errors::CommandError;
use super::geometry::Vec2;
use super::ids::UnitId;
use super::units::UnitRole;

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub pos: Vec2,
    pub sides: u8,
    pub role: UnitRole,
    /// Price the client expects to pay; never below the table cost.
    pub cost: u32,
    /// Size the client rendered. Informational only.
    pub size_hint: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    PlaceUnit(Placement),
    MoveUnit { unit_id: UnitId, target: Vec2 },
    ReplicateUnit { unit_id: UnitId, cost: u32 },
    SpawnFighter { unit_id: UnitId },
    SetName { name: String },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlaceUnit(_) => "place_unit",
            Self::MoveUnit { .. } => "move_unit",
            Self::ReplicateUnit { .. } => "replicate_unit",
            Self::SpawnFighter { .. } => "spawn_fighter",
            Self::SetName { .. } => "set_name",
        }
    }

    /// Whether the intent changes the board and is therefore refused between matches.
    pub fn is_gameplay(&self) -> bool {
        !matches!(self, Self::SetName { .. })
    }
}

pub fn validate_display_name(value: &str) -> Result<String, CommandError> {
    // Keep names compact and readable for the scoreboard and logs.
    const MIN_LEN: usize = 3;
    const MAX_LEN: usize = 32;

    let len = value.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return Err(CommandError::InvalidName);
    }
    if value.trim() != value {
        return Err(CommandError::InvalidName);
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
    {
        return Err(CommandError::InvalidName);
    }

    Ok(value.to_string())
}
