//! MessagePusher trait 定義
//!
//! クライアントへのメッセージ送信のインターフェース。
//! 各接続は上限付きの送信キュー（`PusherChannel`）を持ち、専用の書き込みタスクがそれを消費する。
//! キューが満杯の場合はその接続宛てのフレームだけを破棄し、他の接続への配送は止めない。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{
    Notify,
    mpsc::{self, error::TrySendError},
};

use super::{MessagePushError, value_object::{ConnectionId, RoomId}};

/// 書き込みタスクへ渡すフレーム
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Protocol-level liveness probe.
    Ping,
}

/// 送信側ハンドル（Registry が保持する）
#[derive(Debug, Clone)]
pub struct PusherChannel {
    sender: mpsc::Sender<OutboundFrame>,
    closer: Arc<Notify>,
}

/// 受信側ハンドル（接続ごとの書き込みタスクが保持する）
#[derive(Debug)]
pub struct PusherReceiver {
    frames: mpsc::Receiver<OutboundFrame>,
    closer: Arc<Notify>,
}

/// Create a bounded outbound queue holding at most `capacity` frames.
pub fn pusher_channel(capacity: usize) -> (PusherChannel, PusherReceiver) {
    let (sender, frames) = mpsc::channel(capacity.max(1));
    let closer = Arc::new(Notify::new());
    (
        PusherChannel {
            sender,
            closer: closer.clone(),
        },
        PusherReceiver { frames, closer },
    )
}

impl PusherChannel {
    /// Enqueue without waiting; a full queue drops the frame.
    pub fn try_push(&self, frame: OutboundFrame) -> Result<(), TrySendError<OutboundFrame>> {
        self.sender.try_send(frame)
    }

    /// Ask the writer task to close the socket. Not queued behind pending frames.
    pub fn close(&self) {
        self.closer.notify_one();
    }
}

impl PusherReceiver {
    /// Split into the frame queue and the close signal so a writer can `select!` on both.
    ///
    /// The close signal keeps a permit, so a `close()` issued before the writer starts
    /// waiting is still observed.
    pub fn into_parts(self) -> (mpsc::Receiver<OutboundFrame>, Arc<Notify>) {
        (self.frames, self.closer)
    }
}

/// MessagePusher trait
///
/// UseCase 層はこの trait を通してクライアントへ通知する。
/// ルーム単位のブロードキャストは「その時点でルームに居る接続」にだけ届く。
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 特定の接続へ送信
    async fn push_to(&self, id: &ConnectionId, content: &str) -> Result<(), MessagePushError>;

    /// ルームの全接続へ送信し、キューに積めた接続数を返す（一部失敗は許容）
    async fn broadcast_to_room(&self, room: &RoomId, content: &str) -> usize;

    /// 生存確認の ping を送信
    async fn ping(&self, id: &ConnectionId) -> Result<(), MessagePushError>;

    /// 接続を強制的に閉じる
    async fn terminate(&self, id: &ConnectionId) -> Result<(), MessagePushError>;

    /// 全接続を強制的に閉じる（シャットダウン用）
    async fn terminate_all(&self) -> usize;
}
