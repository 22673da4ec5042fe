//! Fixtures shared by the use case tests.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    domain::{
        Connection, ConnectionId, ConnectionRepository, OutboundFrame, RoomId, Timestamp,
        pusher_channel,
    },
    infrastructure::repository::InMemoryConnectionRepository,
};

pub fn room(name: &str) -> RoomId {
    RoomId::new(name.to_string()).unwrap()
}

/// Register a connection directly, bypassing the connect use case.
pub async fn register(
    repo: &Arc<InMemoryConnectionRepository>,
    room_name: &str,
    at: i64,
) -> (ConnectionId, mpsc::Receiver<OutboundFrame>) {
    let id = ConnectionId::generate();
    let (channel, receiver) = pusher_channel(64);
    repo.register(Connection::open(id, room(room_name), Timestamp::new(at)), channel)
        .await;
    let (frames, _closer) = receiver.into_parts();
    (id, frames)
}

/// All text frames queued so far, parsed as JSON.
pub fn drain(frames: &mut mpsc::Receiver<OutboundFrame>) -> Vec<Value> {
    let mut out = Vec::new();
    while let Ok(frame) = frames.try_recv() {
        if let OutboundFrame::Text(text) = frame {
            out.push(serde_json::from_str(&text).unwrap());
        }
    }
    out
}

/// Tags of `drain`ed frames, in order.
pub fn tags(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .map(|value| value["t"].as_str().unwrap_or_default().to_string())
        .collect()
}
