//! UseCase: ルーム表示状態の読み書きと配信
//!
//! スロットの書き込みと配信、リプレイの読み出しと送信キューへの積み込みを
//! 1 つのロックの下で行います。これにより、新しい接続がリプレイで古い状態を
//! 最新の公開より後に受け取ることはなく、ルームへの配信順はスロットの書き込み順と一致します。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisplayBoard::replay_to() / publish() メソッド
//!
//! ### なぜこのテストが必要か
//! - リプレイ中に gm の公開が割り込んでも、クライアントが最後に見る状態がストアと一致することを保証
//! - 同時に 2 つの公開があっても、配信順が保存順と一致することを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：リプレイ、公開
//! - エッジケース：ストアの読み書き中に別の操作が割り込む

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, Envelope, MessagePusher, RoomId, RoomStateRepository, Slot,
};

/// ルーム表示状態の唯一の書き手
pub struct DisplayBoard {
    room_states: Arc<dyn RoomStateRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    gate: Mutex<()>,
}

impl DisplayBoard {
    pub fn new(
        room_states: Arc<dyn RoomStateRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            room_states,
            message_pusher,
            gate: Mutex::new(()),
        }
    }

    /// Queue every non-empty slot of `room` to connection `id`, in replay order.
    ///
    /// Returns the number of messages queued.
    pub async fn replay_to(&self, id: &ConnectionId, room: &RoomId) -> usize {
        let _guard = self.gate.lock().await;
        let mut queued = 0;
        for message in self.room_states.replay_all(room).await {
            match self.message_pusher.push_to(id, &message.to_json()).await {
                Ok(()) => queued += 1,
                Err(e) => tracing::warn!("Failed to replay state to '{}': {}", id, e),
            }
        }
        queued
    }

    /// Store `envelope` in `slot` (if any) and broadcast it to `room`.
    ///
    /// Returns the number of connections the message was queued for.
    pub async fn publish(&self, room: &RoomId, slot: Option<Slot>, envelope: Envelope) -> usize {
        let content = envelope.to_json();
        let _guard = self.gate.lock().await;
        if let Some(slot) = slot {
            self.room_states.set(room.clone(), slot, envelope).await;
        }
        self.message_pusher.broadcast_to_room(room, &content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Snapshot,
        infrastructure::repository::{InMemoryConnectionRepository, InMemoryRoomStateRepository},
        usecase::testing::{drain, register, room},
    };
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };
    use tokio::sync::Notify;

    /// 最初の `replay_all` または `set` の途中で止まり、`release` されるまで戻らないストア
    struct PausingRoomStates {
        inner: InMemoryRoomStateRepository,
        pause_on_replay: bool,
        armed: AtomicBool,
        paused: Notify,
        release: Notify,
    }

    impl PausingRoomStates {
        fn new(pause_on_replay: bool) -> Self {
            Self {
                inner: InMemoryRoomStateRepository::new(),
                pause_on_replay,
                armed: AtomicBool::new(true),
                paused: Notify::new(),
                release: Notify::new(),
            }
        }

        async fn pause_once(&self) {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.paused.notify_one();
                self.release.notified().await;
            }
        }
    }

    #[async_trait]
    impl RoomStateRepository for PausingRoomStates {
        async fn get(&self, room: &RoomId, slot: Slot) -> Option<Envelope> {
            self.inner.get(room, slot).await
        }

        async fn set(&self, room: RoomId, slot: Slot, message: Envelope) {
            self.inner.set(room, slot, message).await;
            if !self.pause_on_replay {
                self.pause_once().await;
            }
        }

        async fn replay_all(&self, room: &RoomId) -> Vec<Envelope> {
            let replay = self.inner.replay_all(room).await;
            if self.pause_on_replay {
                self.pause_once().await;
            }
            replay
        }

        async fn export(&self) -> Snapshot {
            self.inner.export().await
        }

        async fn import(&self, snapshot: Snapshot) {
            self.inner.import(snapshot).await
        }
    }

    fn scene(title: &str) -> Envelope {
        serde_json::from_value(json!({"t": "DISPLAY_SCENE_STATE", "title": title})).unwrap()
    }

    fn titles(values: &[Value]) -> Vec<String> {
        values
            .iter()
            .map(|value| value["title"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_publish_during_replay_is_delivered_after_replay() {
        // テスト項目: リプレイの読み出し後に公開が割り込んでも、クライアントが最後に受け取るのは最新の状態
        // given (前提条件):
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let room_states = Arc::new(PausingRoomStates::new(true));
        room_states.inner.set(room("demo"), Slot::Scene, scene("S1")).await;
        let board = Arc::new(DisplayBoard::new(room_states.clone(), connections.clone()));
        let (client, mut frames) = register(&connections, "demo", 0).await;

        // when (操作):
        let replay = tokio::spawn({
            let board = board.clone();
            async move { board.replay_to(&client, &room("demo")).await }
        });
        room_states.paused.notified().await;
        let publish = tokio::spawn({
            let board = board.clone();
            async move { board.publish(&room("demo"), Some(Slot::Scene), scene("S2")).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!publish.is_finished());
        room_states.release.notify_one();
        assert_eq!(replay.await.unwrap(), 1);
        assert_eq!(publish.await.unwrap(), 1);

        // then (期待する結果):
        assert_eq!(titles(&drain(&mut frames)), vec!["S1", "S2"]);
        assert_eq!(
            room_states.get(&room("demo"), Slot::Scene).await,
            Some(scene("S2"))
        );
    }

    #[tokio::test]
    async fn test_concurrent_publishes_are_delivered_in_store_order() {
        // テスト項目: 同時の公開でも、ルームへの配信順はスロットへの書き込み順と一致する
        // given (前提条件):
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let room_states = Arc::new(PausingRoomStates::new(false));
        let board = Arc::new(DisplayBoard::new(room_states.clone(), connections.clone()));
        let (_member, mut frames) = register(&connections, "demo", 0).await;

        // when (操作):
        let first = tokio::spawn({
            let board = board.clone();
            async move { board.publish(&room("demo"), Some(Slot::Scene), scene("P1")).await }
        });
        room_states.paused.notified().await;
        let second = tokio::spawn({
            let board = board.clone();
            async move { board.publish(&room("demo"), Some(Slot::Scene), scene("P2")).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        room_states.release.notify_one();
        first.await.unwrap();
        second.await.unwrap();

        // then (期待する結果):
        assert_eq!(titles(&drain(&mut frames)), vec!["P1", "P2"]);
        assert_eq!(
            room_states.get(&room("demo"), Slot::Scene).await,
            Some(scene("P2"))
        );
    }

    #[tokio::test]
    async fn test_replay_to_empty_room_queues_nothing() {
        // テスト項目: 表示状態の無いルームへのリプレイは何も送らない
        // given (前提条件):
        let connections = Arc::new(InMemoryConnectionRepository::new());
        let board = DisplayBoard::new(
            Arc::new(InMemoryRoomStateRepository::new()),
            connections.clone(),
        );
        let (client, mut frames) = register(&connections, "demo", 0).await;

        // when (操作):
        let queued = board.replay_to(&client, &room("demo")).await;

        // then (期待する結果):
        assert_eq!(queued, 0);
        assert!(drain(&mut frames).is_empty());
    }
}
