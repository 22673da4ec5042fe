//! Wire protocol: inbound classification and outbound server messages.
//!
//! Every frame is a single JSON object whose string field `t` selects the variant.
//! Display and chat payloads are relayed verbatim, so they are kept as raw JSON
//! objects (`Envelope`) rather than typed structs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{
    entity::Slot,
    value_object::{Nickname, Role, RoomId, Timestamp},
};

/// Payload ceiling, checked before any parsing.
pub const MAX_PAYLOAD_BYTES: usize = 256 * 1024;

pub const TAG_JOIN: &str = "join";
pub const TAG_JOINED: &str = "joined";
pub const TAG_CHAT_MSG: &str = "chat:msg";
pub const TAG_CHAT_PRESENCE: &str = "chat:presence";
pub const DISPLAY_TAG_PREFIX: &str = "DISPLAY_";
pub const CHAT_TAG_PREFIX: &str = "chat:";

/// A JSON object frame as received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The `t` discriminator, if present and a string.
    pub fn tag(&self) -> Option<&str> {
        self.0.get("t").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string field, or `None`.
    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Room the frame addresses: its own non-empty `room` field, otherwise `fallback`.
    pub fn target_room(&self, fallback: &RoomId) -> RoomId {
        self.non_empty_str("room")
            .and_then(|room| RoomId::new(room.to_string()).ok())
            .unwrap_or_else(|| fallback.clone())
    }

    /// Rewrite a `chat:msg` with server-known sender fields.
    ///
    /// `nick` and `room` are always overwritten; `ts` is stamped only when the client
    /// left it out or sent a falsy value.
    pub fn canonicalize_chat(&mut self, nickname: &Nickname, room: &RoomId, now: Timestamp) {
        if self.0.get("ts").is_none_or(is_falsy) {
            self.0.insert("ts".to_string(), Value::from(now.value()));
        }
        self.0
            .insert("nick".to_string(), Value::from(nickname.as_str()));
        self.0.insert("room".to_string(), Value::from(room.as_str()));
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Fields of a `join` frame that survived validation.
///
/// Missing or invalid fields are `None` and leave the connection's current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinRequest {
    pub room: Option<RoomId>,
    pub nickname: Option<Nickname>,
    pub role: Option<Role>,
}

impl JoinRequest {
    fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            room: envelope
                .non_empty_str("room")
                .and_then(|room| RoomId::new(room.to_string()).ok()),
            nickname: envelope
                .non_empty_str("nick")
                .and_then(|nick| Nickname::new(nick.to_string()).ok()),
            role: envelope
                .get("role")
                .and_then(Value::as_str)
                .and_then(|role| Role::try_from(role).ok()),
        }
    }
}

/// Why an inbound frame cannot be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    Oversized { len: usize, limit: usize },
    MalformedJson,
    MissingTag,
    UnknownTag(String),
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Join(JoinRequest),
    /// `DISPLAY_*`; `slot` is `None` for display kinds that are relayed but not retained.
    Display {
        slot: Option<Slot>,
        envelope: Envelope,
    },
    /// `chat:*`
    Chat(Envelope),
}

impl InboundMessage {
    /// Classify a raw frame.
    ///
    /// The size ceiling is enforced before the payload is parsed.
    pub fn parse(raw: &str, max_payload_bytes: usize) -> Result<Self, ProtocolViolation> {
        if raw.len() > max_payload_bytes {
            return Err(ProtocolViolation::Oversized {
                len: raw.len(),
                limit: max_payload_bytes,
            });
        }

        let fields = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) | Err(_) => return Err(ProtocolViolation::MalformedJson),
        };
        let envelope = Envelope::new(fields);

        let tag = envelope
            .tag()
            .ok_or(ProtocolViolation::MissingTag)?
            .to_string();

        if tag == TAG_JOIN {
            Ok(Self::Join(JoinRequest::from_envelope(&envelope)))
        } else if tag.starts_with(DISPLAY_TAG_PREFIX) {
            Ok(Self::Display {
                slot: Slot::from_tag(&tag),
                envelope,
            })
        } else if tag.starts_with(CHAT_TAG_PREFIX) {
            Ok(Self::Chat(envelope))
        } else {
            Err(ProtocolViolation::UnknownTag(tag))
        }
    }
}

/// Frames generated by the relay itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Acknowledges a `join` with the resolved context.
    Joined {
        room: RoomId,
        nickname: Nickname,
        role: Role,
    },
    /// Nicknames currently in `room`.
    Presence {
        room: RoomId,
        nicknames: Vec<Nickname>,
    },
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        let value = match self {
            ServerMessage::Joined {
                room,
                nickname,
                role,
            } => json!({
                "t": TAG_JOINED,
                "room": room.as_str(),
                "nick": nickname.as_str(),
                "role": role.as_str(),
            }),
            ServerMessage::Presence { room, nicknames } => json!({
                "t": TAG_CHAT_PRESENCE,
                "room": room.as_str(),
                "nicks": nicknames.iter().map(Nickname::as_str).collect::<Vec<_>>(),
            }),
        };
        value.to_string()
    }
}
