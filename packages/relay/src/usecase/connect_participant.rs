//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - 接続の登録、ルーム状態のリプレイ、プレゼンス通知
//!
//! ### なぜこのテストが必要か
//! - 後から接続したクライアントが `join` 前でもルームの最新の表示状態を受け取れることを保証
//! - 接続直後の接続は anon / player として扱われることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：表示状態があるルームへの接続
//! - エッジケース：表示状態が無いルームへの接続（プレゼンスのみ届く）

use std::sync::Arc;

use archei_shared::time::Clock;

use crate::domain::{
    Connection, ConnectionId, ConnectionRepository, PusherChannel, RoomId, Timestamp,
};

use super::{display_board::DisplayBoard, presence::PresenceTracker};

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    connections: Arc<dyn ConnectionRepository>,
    display_board: Arc<DisplayBoard>,
    presence: Arc<PresenceTracker>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        display_board: Arc<DisplayBoard>,
        presence: Arc<PresenceTracker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connections,
            display_board,
            presence,
            clock,
        }
    }

    /// 参加者接続を実行
    ///
    /// # Arguments
    ///
    /// * `id` - 新しい接続の ID
    /// * `room` - 接続時のルーム（クエリ文字列、無ければ既定のルーム）
    /// * `channel` - この接続への送信キュー
    ///
    /// # Returns
    ///
    /// 登録された接続（anon / player）
    pub async fn execute(
        &self,
        id: ConnectionId,
        room: RoomId,
        channel: PusherChannel,
    ) -> Connection {
        let now = Timestamp::new(self.clock.now_millis());
        let connection = Connection::open(id, room, now);

        // 1. レジストリに登録
        self.connections
            .register(connection.clone(), channel)
            .await;

        // 2. ルームの表示状態をこの接続にだけリプレイ
        self.display_board.replay_to(&id, &connection.room).await;

        // 3. ルームにプレゼンスを通知
        self.presence.announce(&connection.room).await;

        connection
    }
}
