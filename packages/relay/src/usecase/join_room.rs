//! UseCase: `join` 処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - 接続コンテキストの更新、`joined` の返信、ルーム状態のリプレイ、プレゼンス通知の順序
//!
//! ### なぜこのテストが必要か
//! - クライアントは `joined` を受け取ってから表示状態を受け取る前提で実装されている
//! - ルーム移動時、移動前のルームのプレゼンスも更新される必要がある
//!
//! ### どのような状況を想定しているか
//! - 正常系：同じルームでの join、別ルームへの移動
//! - エッジケース：項目が欠けた join（現在の値を維持）、繰り返しの join

use std::sync::Arc;

use crate::domain::{
    Connection, ConnectionId, ConnectionRepository, JoinRequest, MessagePusher, RepositoryError,
    ServerMessage,
};

use super::{display_board::DisplayBoard, error::JoinRoomError, presence::PresenceTracker};

/// `join` のユースケース
pub struct JoinRoomUseCase {
    connections: Arc<dyn ConnectionRepository>,
    display_board: Arc<DisplayBoard>,
    message_pusher: Arc<dyn MessagePusher>,
    presence: Arc<PresenceTracker>,
}

impl JoinRoomUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        display_board: Arc<DisplayBoard>,
        message_pusher: Arc<dyn MessagePusher>,
        presence: Arc<PresenceTracker>,
    ) -> Self {
        Self {
            connections,
            display_board,
            message_pusher,
            presence,
        }
    }

    /// `join` を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Connection)` - 更新後の接続
    /// * `Err(JoinRoomError)` - 接続が登録されていない
    pub async fn execute(
        &self,
        id: &ConnectionId,
        request: &JoinRequest,
    ) -> Result<Connection, JoinRoomError> {
        let previous_room = self
            .connections
            .get(id)
            .await
            .map(|connection| connection.room)
            .ok_or_else(|| JoinRoomError::ConnectionNotFound(id.to_string()))?;

        // 1. 接続コンテキストを更新
        let connection = self
            .connections
            .apply_join(id, request)
            .await
            .map_err(|e| match e {
                RepositoryError::ConnectionNotFound(id) => JoinRoomError::ConnectionNotFound(id),
            })?;

        // 2. joined を返信
        let joined = ServerMessage::Joined {
            room: connection.room.clone(),
            nickname: connection.nickname.clone(),
            role: connection.role,
        };
        if let Err(e) = self.message_pusher.push_to(id, &joined.to_json()).await {
            tracing::warn!("Failed to send joined to '{}': {}", id, e);
        }

        // 3. (新しい) ルームの表示状態をリプレイ
        self.display_board.replay_to(id, &connection.room).await;

        // 4. プレゼンス通知（ルームを移動した場合は移動前のルームにも）
        self.presence.announce(&connection.room).await;
        if previous_room != connection.room {
            self.presence.announce(&previous_room).await;
        }

        tracing::info!(
            "Connection '{}' joined room '{}' as '{}' ({})",
            id,
            connection.room,
            connection.nickname.as_str(),
            connection.role
        );
        Ok(connection)
    }
}
