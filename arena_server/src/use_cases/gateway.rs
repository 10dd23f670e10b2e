// Command gateway: validates client intents and routes them to the owning room.

use super::registry::{JoinedRoom, RoomHandle, RoomRegistry};
use super::types::{RoomCommand, RoomSummary};
use crate::domain::{CommandError, Intent, PlacementRejection};
use std::sync::Arc;
use tokio::sync::oneshot;

const MAX_ROOM_ID_LEN: usize = 32;

/// Accepts room ids of 1-32 ASCII letters, digits, `_` or `-`.
pub fn validate_room_id(value: &str) -> Result<&str, CommandError> {
    let value = value.trim();
    let valid = !value.is_empty()
        && value.len() <= MAX_ROOM_ID_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
    if valid {
        Ok(value)
    } else {
        Err(CommandError::InvalidRoomId)
    }
}

/// Rejects intents that carry numbers no room could act on.
pub fn validate_intent(intent: &Intent) -> Result<(), CommandError> {
    match intent {
        Intent::PlaceUnit(placement) if !placement.pos.is_finite() => Err(
            CommandError::InvalidPlacement(PlacementRejection::OutOfBounds),
        ),
        Intent::MoveUnit { target, .. } if !target.is_finite() => Err(CommandError::InvalidTarget),
        _ => Ok(()),
    }
}

/// Front door for every player action. Owns no state beyond the registry.
#[derive(Clone)]
pub struct CommandGateway {
    registry: Arc<RoomRegistry>,
}

impl CommandGateway {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub async fn join(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> Result<JoinedRoom, CommandError> {
        let room_id = validate_room_id(room_id)?;
        self.registry.join_room(room_id, player_id.to_string()).await
    }

    pub async fn leave(&self, room_id: &str, player_id: &str) -> Result<usize, CommandError> {
        self.registry.leave_room(room_id, player_id.to_string()).await
    }

    /// Forwards an intent to the room and waits for the worker's verdict.
    pub async fn submit(
        &self,
        room: &RoomHandle,
        player_id: &str,
        intent: Intent,
    ) -> Result<(), CommandError> {
        validate_intent(&intent)?;

        let (reply, reply_rx) = oneshot::channel();
        room.command_tx
            .send(RoomCommand::Intent {
                player_id: player_id.to_string(),
                intent,
                reply,
            })
            .await
            .map_err(|_| CommandError::RoomNotFound)?;
        reply_rx.await.map_err(|_| CommandError::RoomNotFound)?
    }

    pub async fn rooms(&self) -> Vec<RoomSummary> {
        self.registry.list_rooms().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Placement, RoomEvent, Rules, UnitRole, Vec2};
    use crate::use_cases::registry::RoomSettings;
    use crate::use_cases::types::RoomUpdate;
    use std::time::Duration;

    fn gateway() -> CommandGateway {
        let mut rules = Rules::default();
        rules.spawn.hostile_chance = 0.0;
        rules.economy.accrual_chance = 0.0;
        CommandGateway::new(Arc::new(RoomRegistry::new(RoomSettings {
            command_channel_capacity: 16,
            update_broadcast_capacity: 64,
            tick_interval: Duration::from_millis(100),
            snapshot_every_ticks: 10,
            rules: Arc::new(rules),
            seed: Some(1),
        })))
    }

    fn producer_at(x: f32, y: f32) -> Intent {
        Intent::PlaceUnit(Placement {
            pos: Vec2::new(x, y),
            sides: 3,
            role: UnitRole::Producer,
            cost: 10,
            size_hint: None,
        })
    }

    #[test]
    fn when_room_id_has_odd_characters_then_it_is_rejected() {
        assert_eq!(validate_room_id("ABC123"), Ok("ABC123"));
        assert_eq!(validate_room_id(" lobby_1 "), Ok("lobby_1"));
        assert_eq!(validate_room_id(""), Err(CommandError::InvalidRoomId));
        assert_eq!(validate_room_id("a/b"), Err(CommandError::InvalidRoomId));
        assert_eq!(
            validate_room_id(&"x".repeat(33)),
            Err(CommandError::InvalidRoomId)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn when_player_places_a_producer_then_everyone_sees_the_new_balance() {
        let gateway = gateway();
        let JoinedRoom { room, .. } = gateway.join("ABC123", "p1").await.expect("join");
        gateway.join("ABC123", "p2").await.expect("join");
        let mut updates = room.update_tx.subscribe();

        gateway
            .submit(&room, "p1", producer_at(100.0, 100.0))
            .await
            .expect("placement succeeds");

        match updates.recv().await {
            Ok(RoomUpdate::Event {
                event: RoomEvent::UnitPlaced { unit, resources },
                ..
            }) => {
                assert_eq!(resources, 90.0);
                assert_eq!(unit.sides, 3);
                assert_eq!(unit.role, UnitRole::Producer);
                assert_eq!(unit.owner_id.as_deref(), Some("p1"));
            }
            other => panic!("expected unit placed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn when_placement_is_rejected_then_the_error_comes_back_to_the_caller() {
        let gateway = gateway();
        let JoinedRoom { room, .. } = gateway.join("ROOM", "p1").await.expect("join");
        gateway
            .submit(&room, "p1", producer_at(0.0, 0.0))
            .await
            .expect("first placement");

        assert_eq!(
            gateway.submit(&room, "p1", producer_at(5.0, 0.0)).await,
            Err(CommandError::InvalidPlacement(PlacementRejection::Overlap))
        );
        assert_eq!(
            gateway.submit(&room, "p1", producer_at(f32::NAN, 0.0)).await,
            Err(CommandError::InvalidPlacement(PlacementRejection::OutOfBounds))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn when_room_is_gone_then_room_not_found() {
        let gateway = gateway();
        let JoinedRoom { room, .. } = gateway.join("GONE", "p1").await.expect("join");
        assert_eq!(gateway.leave("GONE", "p1").await, Ok(0));

        // Let the worker observe its shutdown.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(
            gateway.submit(&room, "p1", producer_at(0.0, 0.0)).await,
            Err(CommandError::RoomNotFound)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn when_join_uses_invalid_room_id_then_no_room_is_created() {
        let gateway = gateway();
        assert!(matches!(
            gateway.join("bad room!", "p1").await,
            Err(CommandError::InvalidRoomId)
        ));
        assert!(gateway.rooms().await.is_empty());
    }
}
