//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{
    PersistenceError, RepositoryError,
    entity::{Connection, Slot, Snapshot},
    message::{Envelope, JoinRequest},
    message_pusher::PusherChannel,
    value_object::{ConnectionId, Nickname, RoomId, Timestamp},
};

/// 接続レジストリ
///
/// 生きている接続とそのコンテキスト（ルーム・ニックネーム・ロール・最終生存確認時刻）を管理する。
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// 接続を登録
    async fn register(&self, connection: Connection, channel: PusherChannel);

    /// 接続を削除（登録されていなければ `None`）
    async fn unregister(&self, id: &ConnectionId) -> Option<Connection>;

    /// 接続を取得
    async fn get(&self, id: &ConnectionId) -> Option<Connection>;

    /// `join` を適用し、更新後の接続を返す
    async fn apply_join(
        &self,
        id: &ConnectionId,
        request: &JoinRequest,
    ) -> Result<Connection, RepositoryError>;

    /// 最終生存確認時刻を更新
    async fn touch(&self, id: &ConnectionId, at: Timestamp) -> Result<(), RepositoryError>;

    /// 登録順に並んだ接続のスナップショット（走査中にレジストリを変更しても安全）
    async fn list(&self) -> Vec<Connection>;

    /// ルームに居る接続のニックネーム（登録順）
    async fn nicknames_in(&self, room: &RoomId) -> Vec<Nickname>;

    /// 接続数
    async fn count(&self) -> usize;
}

/// ルーム表示状態のストア（スロット単位の last-writer-wins）
#[async_trait]
pub trait RoomStateRepository: Send + Sync {
    async fn get(&self, room: &RoomId, slot: Slot) -> Option<Envelope>;

    async fn set(&self, room: RoomId, slot: Slot, message: Envelope);

    /// 空でないスロットを scene, countdown, clocks, initiative の順で返す
    async fn replay_all(&self, room: &RoomId) -> Vec<Envelope>;

    /// 全ルームの状態をコピー
    async fn export(&self) -> Snapshot;

    /// スナップショットで状態を置き換える（起動時のロード用）
    async fn import(&self, snapshot: Snapshot);
}

/// スナップショットの保存先
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// 保存済みスナップショットを読み込む（未保存なら `None`）
    async fn load(&self) -> Result<Option<Snapshot>, PersistenceError>;

    /// スナップショットを書き込む（既存ファイルはバックアップへ退避）
    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}
