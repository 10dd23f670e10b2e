// Wire protocol DTOs and conversions for public arena server messages.
// Domain types stay serde-free; everything on the wire goes through here.

use crate::domain::{
    CommandError, HistoryEntry, Intent, Placement, PlayerSnapshot, RemovalCause, RoomEvent,
    RoomSnapshot, ScoreEntry, UnitId, UnitRole, UnitSnapshot, Vec2,
};
use crate::use_cases::{RoomSummary, RoomUpdate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after JoinRoom is accepted.
    Identity { player_id: String, room_id: String },
    // Full room state: on join, periodically, and after lag.
    RoomSnapshot(RoomSnapshotDto),
    PlayerJoined(PlayerDto),
    PlayerLeft { player_id: String },
    PlayerRenamed { player_id: String, name: String },
    UnitPlaced { unit: UnitDto, resources: f64 },
    UnitMoved {
        unit_id: String,
        owner_id: String,
        target_x: f32,
        target_y: f32,
    },
    UnitReplicated {
        unit: UnitDto,
        source_id: String,
        resources: f64,
    },
    ResourcesUpdated { balances: Vec<BalanceDto> },
    HostileSpawned(UnitDto),
    FighterSpawned(UnitDto),
    UnitRemoved {
        unit_id: String,
        owner_id: Option<String>,
        cause: &'static str,
        by: Option<String>,
    },
    MatchEnded {
        scores: Vec<ScoreDto>,
        history: Vec<HistoryDto>,
    },
    MatchRestarted(RoomSnapshotDto),
    // Sent only to the player whose command failed.
    CommandRejected { code: &'static str, message: String },
}

/// A broadcast update stamped with the room tick it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateFrame {
    pub tick: u64,
    #[serde(flatten)]
    pub message: ServerMessage,
}

impl From<RoomUpdate> for UpdateFrame {
    fn from(update: RoomUpdate) -> Self {
        match update {
            RoomUpdate::Event { tick, event } => Self {
                tick,
                message: event.into(),
            },
            RoomUpdate::Snapshot(snapshot) => Self {
                tick: snapshot.tick,
                message: ServerMessage::RoomSnapshot((&snapshot).into()),
            },
        }
    }
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Must be the first frame; falls back to the `room_id` query parameter.
    JoinRoom(JoinRoomPayload),
    PlaceUnit(PlaceUnitPayload),
    MoveUnit {
        unit_id: String,
        target_x: f32,
        target_y: f32,
    },
    ReplicateUnit {
        unit_id: String,
        #[serde(default)]
        cost: u32,
    },
    SpawnFighter { unit_id: String },
    SetName { name: String },
    LeaveRoom,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinRoomPayload {
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceUnitPayload {
    pub x: f32,
    pub y: f32,
    pub sides: u8,
    #[serde(default)]
    pub size_hint: Option<f32>,
    #[serde(default)]
    pub cost: u32,
    pub role: RoleDto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleDto {
    Producer,
    Combat,
    Hostile,
    Fighter,
}

impl From<RoleDto> for UnitRole {
    fn from(role: RoleDto) -> Self {
        match role {
            RoleDto::Producer => UnitRole::Producer,
            RoleDto::Combat => UnitRole::Combat,
            RoleDto::Hostile => UnitRole::Hostile,
            RoleDto::Fighter => UnitRole::Fighter,
        }
    }
}

impl From<UnitRole> for RoleDto {
    fn from(role: UnitRole) -> Self {
        match role {
            UnitRole::Producer => RoleDto::Producer,
            UnitRole::Combat => RoleDto::Combat,
            UnitRole::Hostile => RoleDto::Hostile,
            UnitRole::Fighter => RoleDto::Fighter,
        }
    }
}

/// Ids travel as strings; anything that doesn't parse is echoed back as invalid.
pub fn parse_unit_id(value: &str) -> Result<UnitId, CommandError> {
    value
        .trim()
        .parse::<u64>()
        .map(UnitId)
        .map_err(|_| CommandError::InvalidUnitId(value.to_string()))
}

impl ClientMessage {
    /// Converts a gameplay message into a domain intent.
    ///
    /// `JoinRoom` and `LeaveRoom` are session control and yield `None`.
    pub fn into_intent(self) -> Option<Result<Intent, CommandError>> {
        let intent = match self {
            ClientMessage::JoinRoom(_) | ClientMessage::LeaveRoom => return None,
            ClientMessage::PlaceUnit(p) => Ok(Intent::PlaceUnit(Placement {
                pos: Vec2::new(p.x, p.y),
                sides: p.sides,
                role: p.role.into(),
                cost: p.cost,
                size_hint: p.size_hint,
            })),
            ClientMessage::MoveUnit {
                unit_id,
                target_x,
                target_y,
            } => parse_unit_id(&unit_id).map(|unit_id| Intent::MoveUnit {
                unit_id,
                target: Vec2::new(target_x, target_y),
            }),
            ClientMessage::ReplicateUnit { unit_id, cost } => {
                parse_unit_id(&unit_id).map(|unit_id| Intent::ReplicateUnit { unit_id, cost })
            }
            ClientMessage::SpawnFighter { unit_id } => {
                parse_unit_id(&unit_id).map(|unit_id| Intent::SpawnFighter { unit_id })
            }
            ClientMessage::SetName { name } => Ok(Intent::SetName { name }),
        };
        Some(intent)
    }
}

impl From<&CommandError> for ServerMessage {
    fn from(err: &CommandError) -> Self {
        ServerMessage::CommandRejected {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

/// Flattened unit state for wire transmission.
#[derive(Debug, Clone, Serialize)]
pub struct UnitDto {
    pub id: String,
    pub owner_id: Option<String>,
    pub role: RoleDto,
    pub x: f32,
    pub y: f32,
    pub sides: u8,
    pub size: f32,
    pub color: String,
    pub rotation: f32,
    pub target_x: Option<f32>,
    pub target_y: Option<f32>,
    pub parent_id: Option<String>,
    pub last_spawn_at_ms: Option<u64>,
}

impl From<&UnitSnapshot> for UnitDto {
    fn from(unit: &UnitSnapshot) -> Self {
        Self {
            id: unit.id.to_string(),
            owner_id: unit.owner_id.clone(),
            role: unit.role.into(),
            x: unit.x,
            y: unit.y,
            sides: unit.sides,
            size: unit.size,
            color: unit.color.to_string(),
            rotation: unit.rotation,
            target_x: unit.target.map(|t| t.x),
            target_y: unit.target.map(|t| t.y),
            parent_id: unit.parent_id.map(|id| id.to_string()),
            last_spawn_at_ms: unit.last_spawn_at.map(millis),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerDto {
    pub id: String,
    pub name: String,
    pub color: String,
    pub resources: f64,
    pub units: Vec<UnitDto>,
}

impl From<&PlayerSnapshot> for PlayerDto {
    fn from(player: &PlayerSnapshot) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            color: player.color.to_string(),
            resources: player.resources,
            units: player.units.iter().map(UnitDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceDto {
    pub player_id: String,
    pub resources: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreDto {
    pub player_id: String,
    pub name: String,
    pub color: String,
    pub score: u64,
}

impl From<&ScoreEntry> for ScoreDto {
    fn from(score: &ScoreEntry) -> Self {
        Self {
            player_id: score.player_id.clone(),
            name: score.name.clone(),
            color: score.color.to_string(),
            score: score.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryDto {
    pub match_number: u64,
    pub ended_at_ms: u64,
    pub leaders: Vec<ScoreDto>,
}

impl From<&HistoryEntry> for HistoryDto {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            match_number: entry.match_number,
            ended_at_ms: millis(entry.ended_at),
            leaders: entry.leaders.iter().map(ScoreDto::from).collect(),
        }
    }
}

/// Full room state as clients render it.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshotDto {
    pub room_id: String,
    pub tick: u64,
    pub clock_ms: u64,
    pub started_at_ms: u64,
    pub match_duration_ms: u64,
    pub match_number: u64,
    pub finished: bool,
    pub restart_at_ms: Option<u64>,
    pub mode: &'static str,
    pub side_table_version: u32,
    pub players: Vec<PlayerDto>,
    pub enemies: Vec<UnitDto>,
    pub history: Vec<HistoryDto>,
}

impl From<&RoomSnapshot> for RoomSnapshotDto {
    fn from(s: &RoomSnapshot) -> Self {
        Self {
            room_id: s.room_id.to_string(),
            tick: s.tick,
            clock_ms: millis(s.clock),
            started_at_ms: millis(s.started_at),
            match_duration_ms: millis(s.match_duration),
            match_number: s.match_number,
            finished: s.finished,
            restart_at_ms: s.restart_at.map(millis),
            mode: s.mode.as_str(),
            side_table_version: s.side_table_version,
            players: s.players.iter().map(PlayerDto::from).collect(),
            enemies: s.hostiles.iter().map(UnitDto::from).collect(),
            history: s.history.iter().map(HistoryDto::from).collect(),
        }
    }
}

impl From<RoomEvent> for ServerMessage {
    fn from(event: RoomEvent) -> Self {
        match event {
            RoomEvent::PlayerJoined(player) => ServerMessage::PlayerJoined((&player).into()),
            RoomEvent::PlayerLeft { player_id } => ServerMessage::PlayerLeft { player_id },
            RoomEvent::PlayerRenamed { player_id, name } => {
                ServerMessage::PlayerRenamed { player_id, name }
            }
            RoomEvent::UnitPlaced { unit, resources } => ServerMessage::UnitPlaced {
                unit: (&unit).into(),
                resources,
            },
            RoomEvent::UnitMoved {
                unit_id,
                owner_id,
                target,
            } => ServerMessage::UnitMoved {
                unit_id: unit_id.to_string(),
                owner_id,
                target_x: target.x,
                target_y: target.y,
            },
            RoomEvent::UnitReplicated {
                unit,
                source_id,
                resources,
            } => ServerMessage::UnitReplicated {
                unit: (&unit).into(),
                source_id: source_id.to_string(),
                resources,
            },
            RoomEvent::ResourcesUpdated { balances } => ServerMessage::ResourcesUpdated {
                balances: balances
                    .into_iter()
                    .map(|(player_id, resources)| BalanceDto {
                        player_id,
                        resources,
                    })
                    .collect(),
            },
            RoomEvent::HostileSpawned(unit) => ServerMessage::HostileSpawned((&unit).into()),
            RoomEvent::FighterSpawned(unit) => ServerMessage::FighterSpawned((&unit).into()),
            RoomEvent::UnitRemoved {
                unit_id,
                owner_id,
                cause,
            } => {
                let (cause, by) = match cause {
                    RemovalCause::MutualDestruction => ("mutual_destruction", None),
                    RemovalCause::Defeated { by } => ("defeated", Some(by.to_string())),
                    RemovalCause::OutOfBounds => ("out_of_bounds", None),
                    RemovalCause::OwnerLeft => ("owner_left", None),
                };
                ServerMessage::UnitRemoved {
                    unit_id: unit_id.to_string(),
                    owner_id,
                    cause,
                    by,
                }
            }
            RoomEvent::MatchEnded { scores, history } => ServerMessage::MatchEnded {
                scores: scores.iter().map(ScoreDto::from).collect(),
                history: history.iter().map(HistoryDto::from).collect(),
            },
            RoomEvent::MatchRestarted(snapshot) => {
                ServerMessage::MatchRestarted((&snapshot).into())
            }
        }
    }
}

/// Operator listing entry for `GET /rooms`.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummaryDto {
    pub room_id: String,
    pub players: usize,
    pub tick: u64,
}

impl From<RoomSummary> for RoomSummaryDto {
    fn from(summary: RoomSummary) -> Self {
        Self {
            room_id: summary.room_id,
            players: summary.players,
            tick: summary.tick,
        }
    }
}
