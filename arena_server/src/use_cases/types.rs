// Use-case level inputs/outputs for the room workers.

use crate::domain::{CommandError, Intent, PlayerId, RoomEvent, RoomSnapshot};
use tokio::sync::oneshot;

/// A request for the room worker. Every command is answered on its reply channel.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        player_id: PlayerId,
        reply: oneshot::Sender<RoomSnapshot>,
    },
    /// Replies with the number of players still in the room.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<usize>,
    },
    Intent {
        player_id: PlayerId,
        intent: Intent,
        reply: oneshot::Sender<Result<(), CommandError>>,
    },
}

/// Outbound traffic for everyone in a room.
#[derive(Debug, Clone)]
pub enum RoomUpdate {
    /// A single state change, stamped with the tick it happened on.
    Event { tick: u64, event: RoomEvent },
    /// Periodic full state for late subscribers and lag recovery.
    Snapshot(RoomSnapshot),
}

/// Operator view of a running room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub room_id: String,
    pub players: usize,
    pub tick: u64,
}
