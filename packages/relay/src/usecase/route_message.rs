//! UseCase: 受信メッセージの振り分け
//!
//! 1 つの受信フレームを分類し、対応するユースケースへ渡します。
//! 処理できないフレームは `DropReason` として返すだけで、送信者には何も返しません（接続も閉じない）。

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{Connection, ConnectionId, InboundMessage, ProtocolViolation};

use super::{
    error::{JoinRoomError, PublishDisplayError, SendChatError},
    join_room::JoinRoomUseCase,
    publish_display::PublishDisplayUseCase,
    send_chat::SendChatUseCase,
};

/// A frame that was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Joined(Connection),
    Displayed { delivered: usize },
    Chatted { delivered: usize },
}

/// Why a frame was silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("payload of {len} bytes exceeds the {limit} byte limit")]
    Oversized { len: usize, limit: usize },

    #[error("payload is not a JSON object")]
    MalformedJson,

    #[error("payload has no string 't' tag")]
    MissingTag,

    #[error("unknown tag '{0}'")]
    UnknownTag(String),

    #[error("sender is not a game master")]
    Unauthorized,

    #[error("sender is not registered")]
    UnknownConnection,
}

impl From<ProtocolViolation> for DropReason {
    fn from(violation: ProtocolViolation) -> Self {
        match violation {
            ProtocolViolation::Oversized { len, limit } => DropReason::Oversized { len, limit },
            ProtocolViolation::MalformedJson => DropReason::MalformedJson,
            ProtocolViolation::MissingTag => DropReason::MissingTag,
            ProtocolViolation::UnknownTag(tag) => DropReason::UnknownTag(tag),
        }
    }
}

impl From<JoinRoomError> for DropReason {
    fn from(error: JoinRoomError) -> Self {
        match error {
            JoinRoomError::ConnectionNotFound(_) => DropReason::UnknownConnection,
        }
    }
}

impl From<PublishDisplayError> for DropReason {
    fn from(error: PublishDisplayError) -> Self {
        match error {
            PublishDisplayError::ConnectionNotFound(_) => DropReason::UnknownConnection,
            PublishDisplayError::NotGameMaster(_) => DropReason::Unauthorized,
        }
    }
}

impl From<SendChatError> for DropReason {
    fn from(error: SendChatError) -> Self {
        match error {
            SendChatError::ConnectionNotFound(_) => DropReason::UnknownConnection,
        }
    }
}

/// 受信フレームのルーター
pub struct MessageRouter {
    max_payload_bytes: usize,
    join_room: Arc<JoinRoomUseCase>,
    publish_display: Arc<PublishDisplayUseCase>,
    send_chat: Arc<SendChatUseCase>,
}

impl MessageRouter {
    pub fn new(
        max_payload_bytes: usize,
        join_room: Arc<JoinRoomUseCase>,
        publish_display: Arc<PublishDisplayUseCase>,
        send_chat: Arc<SendChatUseCase>,
    ) -> Self {
        Self {
            max_payload_bytes,
            join_room,
            publish_display,
            send_chat,
        }
    }

    /// Classify `raw` and dispatch it on behalf of connection `id`.
    pub async fn route(&self, id: &ConnectionId, raw: &str) -> Result<RouteOutcome, DropReason> {
        match InboundMessage::parse(raw, self.max_payload_bytes)? {
            InboundMessage::Join(request) => {
                let connection = self.join_room.execute(id, &request).await?;
                Ok(RouteOutcome::Joined(connection))
            }
            InboundMessage::Display { slot, envelope } => {
                let delivered = self.publish_display.execute(id, slot, envelope).await?;
                Ok(RouteOutcome::Displayed { delivered })
            }
            InboundMessage::Chat(envelope) => {
                let delivered = self.send_chat.execute(id, envelope).await?;
                Ok(RouteOutcome::Chatted { delivered })
            }
        }
    }
}
