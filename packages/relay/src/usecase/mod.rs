//! UseCase 層
//!
//! 1 つの操作につき 1 つの構造体。依存は `Arc<dyn Trait>` で注入されます。

pub mod connect_participant;
pub mod disconnect_participant;
pub mod display_board;
pub mod error;
pub mod get_rooms;
pub mod heartbeat;
pub mod join_room;
pub mod presence;
pub mod publish_display;
pub mod route_message;
pub mod send_chat;

#[cfg(test)]
pub(crate) mod testing;

pub use connect_participant::ConnectParticipantUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use display_board::DisplayBoard;
pub use error::{JoinRoomError, PublishDisplayError, SendChatError};
pub use get_rooms::{GetRoomsUseCase, RoomOverview};
pub use heartbeat::{HeartbeatMonitor, SweepReport};
pub use join_room::JoinRoomUseCase;
pub use presence::PresenceTracker;
pub use publish_display::PublishDisplayUseCase;
pub use route_message::{DropReason, MessageRouter, RouteOutcome};
pub use send_chat::SendChatUseCase;
