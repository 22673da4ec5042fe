//! HTTP API response DTOs.

use serde::Serialize;

/// Entry of `GET /api/rooms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummaryDto {
    pub id: String,
    pub members: Vec<MemberDto>,
    /// Names of the populated display slots, in replay order
    pub slots: Vec<String>,
}

/// A connection currently in a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberDto {
    pub nick: String,
    pub role: String,
    /// RFC 3339 (UTC)
    pub connected_at: Option<String>,
}
