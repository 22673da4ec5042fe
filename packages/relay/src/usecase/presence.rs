//! UseCase: プレゼンス通知
//!
//! ルームに居る接続のニックネーム一覧を `chat:presence` としてそのルームへ配信します。
//! 状態は持たず、毎回レジストリから再計算します。

use std::sync::Arc;

use crate::domain::{ConnectionRepository, MessagePusher, RoomId, ServerMessage};

/// プレゼンス通知
pub struct PresenceTracker {
    connections: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl PresenceTracker {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            connections,
            message_pusher,
        }
    }

    /// Broadcast the current nickname list of `room` to that room.
    ///
    /// Returns the number of connections the announcement was queued for.
    pub async fn announce(&self, room: &RoomId) -> usize {
        let nicknames = self.connections.nicknames_in(room).await;
        let message = ServerMessage::Presence {
            room: room.clone(),
            nicknames,
        };
        let delivered = self
            .message_pusher
            .broadcast_to_room(room, &message.to_json())
            .await;
        tracing::debug!("Presence for room '{}' sent to {} connections", room, delivered);
        delivered
    }
}
