//! Conversion logic between DTOs and domain entities.

use serde_json::Value;

use archei_shared::time::millis_to_rfc3339;

use crate::domain::{Connection, Envelope, RoomId, RoomState, Slot, Snapshot};
use crate::infrastructure::dto::{http, snapshot::SnapshotDto};

// ========================================
// DTO → Domain Entity
// ========================================

impl From<SnapshotDto> for Snapshot {
    /// Entries with an empty room id or a non-object value are skipped.
    fn from(dto: SnapshotDto) -> Self {
        let mut snapshot = Snapshot::default();
        let maps = [
            (Slot::Scene, dto.scene_by_room),
            (Slot::Countdown, dto.countdown_by_room),
            (Slot::Clocks, dto.clocks_by_room),
            (Slot::Initiative, dto.initiative_by_room),
        ];
        for (slot, entries) in maps {
            for (room, value) in entries {
                let (Ok(room), Value::Object(fields)) = (RoomId::new(room), value) else {
                    tracing::warn!("Skipping malformed {} entry in snapshot", slot.name());
                    continue;
                };
                snapshot
                    .rooms
                    .entry(room)
                    .or_default()
                    .set(slot, Envelope::new(fields));
            }
        }
        snapshot
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&Snapshot> for SnapshotDto {
    fn from(snapshot: &Snapshot) -> Self {
        let mut dto = SnapshotDto::default();
        for (room, state) in &snapshot.rooms {
            for slot in Slot::ALL {
                let Some(message) = state.get(slot) else {
                    continue;
                };
                let map = match slot {
                    Slot::Scene => &mut dto.scene_by_room,
                    Slot::Countdown => &mut dto.countdown_by_room,
                    Slot::Clocks => &mut dto.clocks_by_room,
                    Slot::Initiative => &mut dto.initiative_by_room,
                };
                map.insert(room.as_str().to_string(), message.to_value());
            }
        }
        dto
    }
}

impl From<&Connection> for http::MemberDto {
    fn from(connection: &Connection) -> Self {
        Self {
            nick: connection.nickname.as_str().to_string(),
            role: connection.role.as_str().to_string(),
            connected_at: millis_to_rfc3339(connection.connected_at.value()),
        }
    }
}

/// Build the summary of one room from its state and current members.
pub fn room_summary(
    room: &RoomId,
    state: Option<&RoomState>,
    members: &[Connection],
) -> http::RoomSummaryDto {
    http::RoomSummaryDto {
        id: room.as_str().to_string(),
        members: members.iter().map(http::MemberDto::from).collect(),
        slots: state
            .map(|state| {
                state
                    .populated_slots()
                    .iter()
                    .map(|slot| slot.name().to_string())
                    .collect()
            })
            .unwrap_or_default(),
    }
}
