//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        Query, State,
        rejection::QueryRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};

use crate::{
    domain::{ConnectionId, OutboundFrame, PusherReceiver, RoomId, pusher_channel},
    ui::state::AppState,
};

/// Query parameters for WebSocket connection, in request order
pub type ConnectQuery = Vec<(String, String)>;

/// Initial room: the first `room` parameter, or the default room when it is missing or empty.
pub fn initial_room(query: &[(String, String)]) -> RoomId {
    query
        .iter()
        .find(|(key, _)| key == "room")
        .and_then(|(_, room)| RoomId::new(room.clone()).ok())
        .unwrap_or_else(RoomId::default_room)
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    query: Result<Query<ConnectQuery>, QueryRejection>,
) -> impl IntoResponse {
    let room = match query {
        Ok(Query(query)) => initial_room(&query),
        Err(e) => {
            tracing::debug!("Unreadable connect query, using default room: {}", e);
            RoomId::default_room()
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, room))
}

/// Drains the connection's outbound queue into the socket.
///
/// A close request ends the loop even when frames are still queued.
fn pusher_loop(
    receiver: PusherReceiver,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let (mut frames, closer) = receiver.into_parts();
        loop {
            tokio::select! {
                biased;
                _ = closer.notified() => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
                frame = frames.recv() => {
                    let message = match frame {
                        Some(OutboundFrame::Text(text)) => Message::Text(text.into()),
                        Some(OutboundFrame::Ping) => Message::Ping(Bytes::new()),
                        None => break,
                    };
                    if sender.send(message).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sender.close().await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room: RoomId) {
    let id = ConnectionId::generate();
    let (sender, mut receiver) = socket.split();
    let (channel, outbound) = pusher_channel(state.outbound_buffer);

    // Spawn the writer first so connect-time replay is flushed as soon as it is queued
    let mut send_task = pusher_loop(outbound, sender);

    let connection = state
        .connect_participant_usecase
        .execute(id, room, channel)
        .await;
    tracing::info!("Connection '{}' opened in room '{}'", id, connection.room);

    let state_clone = state.clone();

    // Spawn a task to receive messages from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("WebSocket error on '{}': {}", id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => dispatch(&state_clone, &id, text.as_str()).await,
                Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                    Ok(text) => dispatch(&state_clone, &id, text).await,
                    Err(_) => tracing::debug!("Dropped non UTF-8 binary frame from '{}'", id),
                },
                Message::Pong(_) => state_clone.heartbeat.record_pong(&id).await,
                Message::Ping(_) => {
                    // axum answers pings itself
                }
                Message::Close(_) => {
                    tracing::debug!("Connection '{}' requested close", id);
                    break;
                }
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    match state.disconnect_participant_usecase.execute(&id).await {
        Some(connection) => tracing::info!(
            "Connection '{}' ({}) closed, left room '{}'",
            id,
            connection.nickname.as_str(),
            connection.room
        ),
        None => tracing::debug!("Connection '{}' closed after being pruned", id),
    }
}

async fn dispatch(state: &AppState, id: &ConnectionId, raw: &str) {
    match state.message_router.route(id, raw).await {
        Ok(outcome) => tracing::trace!("Handled frame from '{}': {:?}", id, outcome),
        Err(reason) => tracing::debug!("Dropped frame from '{}': {}", id, reason),
    }
}
