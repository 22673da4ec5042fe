//! UseCase: ルーム一覧の取得

use std::{collections::BTreeMap, sync::Arc};

use crate::domain::{Connection, ConnectionRepository, RoomId, RoomState, RoomStateRepository};

/// 表示状態またはメンバーを持つルーム
#[derive(Debug, Clone, PartialEq)]
pub struct RoomOverview {
    pub room: RoomId,
    pub state: Option<RoomState>,
    /// 登録順
    pub members: Vec<Connection>,
}

/// ルーム一覧取得のユースケース
pub struct GetRoomsUseCase {
    connections: Arc<dyn ConnectionRepository>,
    room_states: Arc<dyn RoomStateRepository>,
}

impl GetRoomsUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        room_states: Arc<dyn RoomStateRepository>,
    ) -> Self {
        Self {
            connections,
            room_states,
        }
    }

    /// Rooms sorted by id.
    pub async fn execute(&self) -> Vec<RoomOverview> {
        let mut rooms: BTreeMap<RoomId, RoomOverview> = self
            .room_states
            .export()
            .await
            .rooms
            .into_iter()
            .map(|(room, state)| {
                let overview = RoomOverview {
                    room: room.clone(),
                    state: Some(state),
                    members: Vec::new(),
                };
                (room, overview)
            })
            .collect();

        for connection in self.connections.list().await {
            rooms
                .entry(connection.room.clone())
                .or_insert_with(|| RoomOverview {
                    room: connection.room.clone(),
                    state: None,
                    members: Vec::new(),
                })
                .members
                .push(connection);
        }

        rooms.into_values().collect()
    }
}
