//! Domain layer: value objects, entities, the wire protocol and the
//! interfaces the use cases depend on.

pub mod entity;
pub mod error;
pub mod message;
pub mod message_pusher;
pub mod persistence;
pub mod repository;
pub mod value_object;

pub use entity::{Connection, RoomState, Slot, Snapshot};
pub use error::{MessagePushError, PersistenceError, RepositoryError, ValueObjectError};
pub use message::{
    Envelope, InboundMessage, JoinRequest, MAX_PAYLOAD_BYTES, ProtocolViolation, ServerMessage,
};
pub use message_pusher::{
    MessagePusher, OutboundFrame, PusherChannel, PusherReceiver, pusher_channel,
};
pub use persistence::PersistenceTrigger;
pub use repository::{ConnectionRepository, RoomStateRepository, SnapshotStore};
pub use value_object::{ConnectionId, Nickname, Role, RoomId, Timestamp};
