//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - レジストリからの削除と、残ったメンバーへのプレゼンス通知
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルームに他のメンバーが残っている状態での切断
//! - エッジケース：既にハートビートで削除済みの接続の切断（何も通知しない）

use std::sync::Arc;

use crate::domain::{Connection, ConnectionId, ConnectionRepository};

use super::presence::PresenceTracker;

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    connections: Arc<dyn ConnectionRepository>,
    presence: Arc<PresenceTracker>,
}

impl DisconnectParticipantUseCase {
    pub fn new(connections: Arc<dyn ConnectionRepository>, presence: Arc<PresenceTracker>) -> Self {
        Self {
            connections,
            presence,
        }
    }

    /// 参加者切断を実行
    ///
    /// # Returns
    ///
    /// * `Some(Connection)` - 削除された接続（そのルームにプレゼンスを通知済み）
    /// * `None` - 既に登録されていなかった
    pub async fn execute(&self, id: &ConnectionId) -> Option<Connection> {
        let connection = self.connections.unregister(id).await?;
        self.presence.announce(&connection.room).await;
        Some(connection)
    }
}
