//! Domain entities: connections, per-room display state and snapshots.

use std::collections::BTreeMap;

use super::{
    message::{Envelope, JoinRequest},
    value_object::{ConnectionId, Nickname, Role, RoomId, Timestamp},
};

/// 接続エンティティ
///
/// ソケットを開いた時点では `anon` / `player` / クエリ文字列のルームで生成され、
/// `join` によってのみ変更される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub room: RoomId,
    pub nickname: Nickname,
    pub role: Role,
    pub connected_at: Timestamp,
    pub last_liveness_at: Timestamp,
}

impl Connection {
    /// A freshly opened, not yet joined connection.
    pub fn open(id: ConnectionId, room: RoomId, now: Timestamp) -> Self {
        Self {
            id,
            room,
            nickname: Nickname::anonymous(),
            role: Role::Player,
            connected_at: now,
            last_liveness_at: now,
        }
    }

    /// Apply a `join`; absent fields keep their current value.
    pub fn apply_join(&mut self, request: &JoinRequest) {
        if let Some(room) = &request.room {
            self.room = room.clone();
        }
        if let Some(nickname) = &request.nickname {
            self.nickname = nickname.clone();
        }
        if let Some(role) = request.role {
            self.role = role;
        }
    }

    /// `true` once the connection has been silent for strictly longer than `timeout_millis`.
    pub fn is_expired(&self, now: Timestamp, timeout_millis: i64) -> bool {
        now.millis_since(self.last_liveness_at) > timeout_millis
    }
}

/// ルームごとに保持される表示カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Scene,
    Countdown,
    Clocks,
    Initiative,
}

impl Slot {
    /// Replay order.
    pub const ALL: [Slot; 4] = [Slot::Scene, Slot::Countdown, Slot::Clocks, Slot::Initiative];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "DISPLAY_SCENE_STATE" => Some(Slot::Scene),
            "DISPLAY_COUNTDOWN" => Some(Slot::Countdown),
            "DISPLAY_CLOCKS_STATE" => Some(Slot::Clocks),
            "DISPLAY_INITIATIVE_STATE" => Some(Slot::Initiative),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Slot::Scene => "DISPLAY_SCENE_STATE",
            Slot::Countdown => "DISPLAY_COUNTDOWN",
            Slot::Clocks => "DISPLAY_CLOCKS_STATE",
            Slot::Initiative => "DISPLAY_INITIATIVE_STATE",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Slot::Scene => "scene",
            Slot::Countdown => "countdown",
            Slot::Clocks => "clocks",
            Slot::Initiative => "initiative",
        }
    }
}

/// 1 ルーム分の表示状態（4 スロット、最後に受理したメッセージをそのまま保持）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomState {
    scene: Option<Envelope>,
    countdown: Option<Envelope>,
    clocks: Option<Envelope>,
    initiative: Option<Envelope>,
}

impl RoomState {
    pub fn get(&self, slot: Slot) -> Option<&Envelope> {
        match slot {
            Slot::Scene => self.scene.as_ref(),
            Slot::Countdown => self.countdown.as_ref(),
            Slot::Clocks => self.clocks.as_ref(),
            Slot::Initiative => self.initiative.as_ref(),
        }
    }

    /// Replace the whole slot.
    pub fn set(&mut self, slot: Slot, message: Envelope) {
        let target = match slot {
            Slot::Scene => &mut self.scene,
            Slot::Countdown => &mut self.countdown,
            Slot::Clocks => &mut self.clocks,
            Slot::Initiative => &mut self.initiative,
        };
        *target = Some(message);
    }

    /// Non-empty slots in replay order.
    pub fn replay(&self) -> Vec<Envelope> {
        Slot::ALL
            .iter()
            .filter_map(|slot| self.get(*slot).cloned())
            .collect()
    }

    pub fn populated_slots(&self) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|slot| self.get(*slot).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.populated_slots().is_empty()
    }
}

/// 全ルームの表示状態のコピー
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub rooms: BTreeMap<RoomId, RoomState>,
}
