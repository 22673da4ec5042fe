//! Value objects for the relay domain.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// 接続 ID（ソケット 1 本ごとに発行される不透明な識別子）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Issue a fresh random connection ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<&str> for ConnectionId {
    type Error = ValueObjectError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| ValueObjectError::InvalidConnectionId(value.to_string()))
    }
}

/// ルーム ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Room used when a connection does not name one.
    pub const DEFAULT: &'static str = "demo";

    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.is_empty() {
            return Err(ValueObjectError::RoomIdEmpty);
        }
        Ok(Self(value))
    }

    /// The `demo` room.
    pub fn default_room() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ニックネーム
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nickname(String);

impl Nickname {
    /// Nickname of a connection that has not joined yet.
    pub const ANONYMOUS: &'static str = "anon";

    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.is_empty() {
            return Err(ValueObjectError::NicknameEmpty);
        }
        Ok(Self(value))
    }

    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Nickname {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Nickname> for String {
    fn from(value: Nickname) -> Self {
        value.0
    }
}

/// 接続のロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Game master: the only role allowed to publish display state.
    Gm,
    #[default]
    Player,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Gm => "gm",
            Role::Player => "player",
        }
    }

    pub fn is_gm(&self) -> bool {
        matches!(self, Role::Gm)
    }
}

impl TryFrom<&str> for Role {
    type Error = ValueObjectError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "gm" => Ok(Role::Gm),
            "player" => Ok(Role::Player),
            other => Err(ValueObjectError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unix タイムスタンプ（ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self` (negative if `earlier` is later).
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_rejects_empty() {
        // テスト項目: 空文字列の RoomId は生成できない
        // given (前提条件):
        let value = String::new();

        // when (操作):
        let result = RoomId::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::RoomIdEmpty));
    }

    #[test]
    fn test_room_id_default_is_demo() {
        // テスト項目: デフォルトルームは "demo"
        // given (前提条件):

        // when (操作):
        let room = RoomId::default_room();

        // then (期待する結果):
        assert_eq!(room.as_str(), "demo");
    }

    #[test]
    fn test_nickname_rejects_empty() {
        // テスト項目: 空文字列の Nickname は生成できない
        // given (前提条件):
        let value = String::new();

        // when (操作):
        let result = Nickname::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::NicknameEmpty));
    }

    #[test]
    fn test_role_parsing() {
        // テスト項目: "gm" / "player" のみがロールとして解釈される
        // given (前提条件):

        // when (操作):
        let gm = Role::try_from("gm");
        let player = Role::try_from("player");
        let admin = Role::try_from("admin");

        // then (期待する結果):
        assert_eq!(gm, Ok(Role::Gm));
        assert_eq!(player, Ok(Role::Player));
        assert_eq!(admin, Err(ValueObjectError::UnknownRole("admin".to_string())));
        assert_eq!(Role::default(), Role::Player);
    }

    #[test]
    fn test_connection_id_round_trips_through_string() {
        // テスト項目: ConnectionId は文字列表現から復元できる
        // given (前提条件):
        let id = ConnectionId::generate();

        // when (操作):
        let parsed = ConnectionId::try_from(id.to_string().as_str());

        // then (期待する結果):
        assert_eq!(parsed, Ok(id));
        assert!(ConnectionId::try_from("not-a-uuid").is_err());
    }

    #[test]
    fn test_timestamp_millis_since() {
        // テスト項目: 2 つのタイムスタンプの差分がミリ秒で得られる
        // given (前提条件):
        let earlier = Timestamp::new(1_000);
        let later = Timestamp::new(61_000);

        // when (操作):
        let elapsed = later.millis_since(earlier);

        // then (期待する結果):
        assert_eq!(elapsed, 60_000);
        assert_eq!(earlier.millis_since(later), -60_000);
    }
}
