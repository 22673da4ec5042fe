//! InMemory Connection Registry 実装
//!
//! ドメイン層が定義する `ConnectionRepository` と `MessagePusher` の両方を
//! 1 つのマップ（1 つのロック）で実装します。
//!
//! ## 設計ノート
//!
//! 接続コンテキスト（ルーム）と送信チャネルを同じロックの下に置くことで、
//! 「ルームの絞り込み」と「キューへの積み込み」が `join` に対して原子的になります。
//! これにより、ブロードキャスト時点でルーム R に居ない接続には R 宛てのメッセージが届きません。

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc::error::TrySendError};

use crate::domain::{
    Connection, ConnectionId, ConnectionRepository, JoinRequest, MessagePushError, MessagePusher,
    Nickname, OutboundFrame, PusherChannel, RepositoryError, RoomId, Timestamp,
};

/// レジストリの 1 エントリ
struct Entry {
    /// 登録順（プレゼンスの並び順に使う）
    seq: u64,
    connection: Connection,
    channel: PusherChannel,
}

/// インメモリ接続レジストリ
#[derive(Default)]
pub struct InMemoryConnectionRepository {
    entries: Mutex<HashMap<ConnectionId, Entry>>,
    next_seq: AtomicU64,
}

impl InMemoryConnectionRepository {
    /// 新しい InMemoryConnectionRepository を作成
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted<'a>(entries: impl Iterator<Item = &'a Entry>) -> Vec<&'a Entry> {
        let mut sorted: Vec<&Entry> = entries.collect();
        sorted.sort_by_key(|entry| entry.seq);
        sorted
    }
}

fn push_frame(
    id: &ConnectionId,
    channel: &PusherChannel,
    frame: OutboundFrame,
) -> Result<(), MessagePushError> {
    channel.try_push(frame).map_err(|e| match e {
        TrySendError::Full(_) => MessagePushError::BufferFull(id.to_string()),
        TrySendError::Closed(_) => MessagePushError::PushFailed(format!("{} is closed", id)),
    })
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn register(&self, connection: Connection, channel: PusherChannel) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let id = connection.id;
        let mut entries = self.entries.lock().await;
        entries.insert(
            id,
            Entry {
                seq,
                connection,
                channel,
            },
        );
        tracing::debug!("Connection '{}' registered ({} total)", id, entries.len());
    }

    async fn unregister(&self, id: &ConnectionId) -> Option<Connection> {
        let mut entries = self.entries.lock().await;
        let removed = entries.remove(id).map(|entry| entry.connection);
        if removed.is_some() {
            tracing::debug!("Connection '{}' unregistered ({} left)", id, entries.len());
        }
        removed
    }

    async fn get(&self, id: &ConnectionId) -> Option<Connection> {
        let entries = self.entries.lock().await;
        entries.get(id).map(|entry| entry.connection.clone())
    }

    async fn apply_join(
        &self,
        id: &ConnectionId,
        request: &JoinRequest,
    ) -> Result<Connection, RepositoryError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(id.to_string()))?;
        entry.connection.apply_join(request);
        Ok(entry.connection.clone())
    }

    async fn touch(&self, id: &ConnectionId, at: Timestamp) -> Result<(), RepositoryError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(id.to_string()))?;
        entry.connection.last_liveness_at = at;
        Ok(())
    }

    async fn list(&self) -> Vec<Connection> {
        let entries = self.entries.lock().await;
        Self::sorted(entries.values())
            .into_iter()
            .map(|entry| entry.connection.clone())
            .collect()
    }

    async fn nicknames_in(&self, room: &RoomId) -> Vec<Nickname> {
        let entries = self.entries.lock().await;
        Self::sorted(entries.values().filter(|entry| &entry.connection.room == room))
            .into_iter()
            .map(|entry| entry.connection.nickname.clone())
            .collect()
    }

    async fn count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl MessagePusher for InMemoryConnectionRepository {
    async fn push_to(&self, id: &ConnectionId, content: &str) -> Result<(), MessagePushError> {
        let entries = self.entries.lock().await;
        let entry = entries
            .get(id)
            .ok_or_else(|| MessagePushError::ClientNotFound(id.to_string()))?;
        push_frame(id, &entry.channel, OutboundFrame::Text(content.to_string()))?;
        tracing::debug!("Pushed message to connection '{}'", id);
        Ok(())
    }

    async fn broadcast_to_room(&self, room: &RoomId, content: &str) -> usize {
        let entries = self.entries.lock().await;
        let mut delivered = 0;
        for (id, entry) in entries
            .iter()
            .filter(|(_, entry)| &entry.connection.room == room)
        {
            // ブロードキャストでは一部の送信失敗を許容
            match push_frame(id, &entry.channel, OutboundFrame::Text(content.to_string())) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!("Dropped broadcast frame for '{}': {}", id, e),
            }
        }
        tracing::debug!("Broadcasted to {} connection(s) in room '{}'", delivered, room);
        delivered
    }

    async fn ping(&self, id: &ConnectionId) -> Result<(), MessagePushError> {
        let entries = self.entries.lock().await;
        let entry = entries
            .get(id)
            .ok_or_else(|| MessagePushError::ClientNotFound(id.to_string()))?;
        push_frame(id, &entry.channel, OutboundFrame::Ping)
    }

    async fn terminate(&self, id: &ConnectionId) -> Result<(), MessagePushError> {
        let entries = self.entries.lock().await;
        let entry = entries
            .get(id)
            .ok_or_else(|| MessagePushError::ClientNotFound(id.to_string()))?;
        entry.channel.close();
        Ok(())
    }

    async fn terminate_all(&self) -> usize {
        let entries = self.entries.lock().await;
        for entry in entries.values() {
            entry.channel.close();
        }
        entries.len()
    }
}
