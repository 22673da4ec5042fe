//! InMemory RoomState Repository 実装
//!
//! ルーム ID をキーに 4 スロットの表示状態を保持します。
//! ルームは最初の publish 時に作られ、明示的には削除されません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Envelope, RoomId, RoomState, RoomStateRepository, Slot, Snapshot};

/// インメモリ RoomState Repository 実装
#[derive(Default)]
pub struct InMemoryRoomStateRepository {
    rooms: Mutex<HashMap<RoomId, RoomState>>,
}

impl InMemoryRoomStateRepository {
    /// 新しい InMemoryRoomStateRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStateRepository for InMemoryRoomStateRepository {
    async fn get(&self, room: &RoomId, slot: Slot) -> Option<Envelope> {
        let rooms = self.rooms.lock().await;
        rooms.get(room).and_then(|state| state.get(slot).cloned())
    }

    async fn set(&self, room: RoomId, slot: Slot, message: Envelope) {
        let mut rooms = self.rooms.lock().await;
        rooms.entry(room).or_default().set(slot, message);
    }

    async fn replay_all(&self, room: &RoomId) -> Vec<Envelope> {
        let rooms = self.rooms.lock().await;
        rooms.get(room).map(RoomState::replay).unwrap_or_default()
    }

    async fn export(&self) -> Snapshot {
        let rooms = self.rooms.lock().await;
        Snapshot {
            rooms: rooms
                .iter()
                .filter(|(_, state)| !state.is_empty())
                .map(|(room, state)| (room.clone(), state.clone()))
                .collect(),
        }
    }

    async fn import(&self, snapshot: Snapshot) {
        let mut rooms = self.rooms.lock().await;
        *rooms = snapshot.rooms.into_iter().collect();
    }
}
