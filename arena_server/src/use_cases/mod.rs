// Use cases layer: room workers, the registry that owns them and the command gateway.

pub mod gateway;
pub mod registry;
pub mod room;
pub mod types;

pub use gateway::CommandGateway;
pub use registry::{JoinedRoom, RoomHandle, RoomObserver, RoomRegistry, RoomSettings};
pub use types::{RoomCommand, RoomSummary, RoomUpdate};
