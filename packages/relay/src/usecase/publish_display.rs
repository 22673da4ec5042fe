//! UseCase: `DISPLAY_*` の公開
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PublishDisplayUseCase::execute() メソッド
//! - gm ロールによる権限チェック、スロットの上書き、永続化の dirty 通知、ルームへの配信
//!
//! ### なぜこのテストが必要か
//! - player が表示状態を書き換えられないことを保証する
//! - スロットは部分更新ではなくメッセージ全体で置き換えられる
//!
//! ### どのような状況を想定しているか
//! - 正常系：gm によるシーンの公開
//! - 異常系：player による公開（破棄、配信も dirty 通知もしない）
//! - エッジケース：`room` フィールドによる別ルームへの公開、スロットを持たない DISPLAY_* 種別

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionRepository, Envelope, PersistenceTrigger, Slot};

use super::{display_board::DisplayBoard, error::PublishDisplayError};

/// `DISPLAY_*` 公開のユースケース
pub struct PublishDisplayUseCase {
    connections: Arc<dyn ConnectionRepository>,
    display_board: Arc<DisplayBoard>,
    persistence: Arc<dyn PersistenceTrigger>,
}

impl PublishDisplayUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        display_board: Arc<DisplayBoard>,
        persistence: Arc<dyn PersistenceTrigger>,
    ) -> Self {
        Self {
            connections,
            display_board,
            persistence,
        }
    }

    /// `DISPLAY_*` の公開を実行
    ///
    /// # Arguments
    ///
    /// * `id` - 送信者の接続 ID
    /// * `slot` - 保持先のスロット（`None` の種別は配信のみ）
    /// * `envelope` - 受信したメッセージ（そのまま保持・配信する）
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 配信した接続数
    /// * `Err(PublishDisplayError)` - 送信者が gm でない、または登録されていない
    pub async fn execute(
        &self,
        id: &ConnectionId,
        slot: Option<Slot>,
        envelope: Envelope,
    ) -> Result<usize, PublishDisplayError> {
        let sender = self
            .connections
            .get(id)
            .await
            .ok_or_else(|| PublishDisplayError::ConnectionNotFound(id.to_string()))?;
        if !sender.role.is_gm() {
            return Err(PublishDisplayError::NotGameMaster(id.to_string()));
        }

        let room = envelope.target_room(&sender.room);
        let delivered = self.display_board.publish(&room, slot, envelope).await;
        if slot.is_some() {
            self.persistence.mark_dirty();
        }

        tracing::debug!(
            "Display update from '{}' broadcast to {} connections in '{}'",
            id,
            delivered,
            room
        );
        Ok(delivered)
    }
}
