//! Dependency wiring.

use std::sync::Arc;

use archei_shared::time::{Clock, SystemClock};

use crate::{
    config::RelayConfig,
    infrastructure::{
        persistence::{JsonFileSnapshotStore, PersistenceScheduler, SnapshotFlusher},
        repository::{InMemoryConnectionRepository, InMemoryRoomStateRepository},
    },
    ui::{AppState, Server},
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, DisplayBoard, GetRoomsUseCase,
        HeartbeatMonitor, JoinRoomUseCase, MessageRouter, PresenceTracker, PublishDisplayUseCase,
        SendChatUseCase,
    },
};

/// Build a relay using the system clock.
pub async fn build_server(config: RelayConfig) -> Server {
    build_server_with_clock(config, Arc::new(SystemClock)).await
}

/// Build a relay: load the saved snapshot, start the persistence actor and wire the use cases.
pub async fn build_server_with_clock(config: RelayConfig, clock: Arc<dyn Clock>) -> Server {
    // Initialize dependencies in order:
    // 1. Repositories
    // 2. Persistence (load snapshot, spawn scheduler)
    // 3. UseCases
    // 4. AppState
    // 5. Server

    // 1. Create Repositories (in-memory)
    //    The connection registry also delivers outbound frames.
    let connections = Arc::new(InMemoryConnectionRepository::new());
    let room_states = Arc::new(InMemoryRoomStateRepository::new());

    // 2. Load the snapshot and start the persistence actor
    let store = Arc::new(JsonFileSnapshotStore::new(config.data_dir.clone()));
    tracing::info!("Snapshot directory: {:?}", store.data_dir());
    let flusher = SnapshotFlusher::new(room_states.clone(), store);
    flusher.load_from_disk().await;
    let (scheduler, persistence) =
        PersistenceScheduler::new(flusher, config.debounce, config.flush_interval);
    let persistence_task = scheduler.spawn();

    // 3. Create UseCases
    let presence = Arc::new(PresenceTracker::new(connections.clone(), connections.clone()));
    let display_board = Arc::new(DisplayBoard::new(room_states.clone(), connections.clone()));
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        connections.clone(),
        display_board.clone(),
        presence.clone(),
        clock.clone(),
    ));
    let disconnect_participant_usecase = Arc::new(DisconnectParticipantUseCase::new(
        connections.clone(),
        presence.clone(),
    ));
    let join_room_usecase = Arc::new(JoinRoomUseCase::new(
        connections.clone(),
        display_board.clone(),
        connections.clone(),
        presence.clone(),
    ));
    let publish_display_usecase = Arc::new(PublishDisplayUseCase::new(
        connections.clone(),
        display_board,
        Arc::new(persistence.clone()),
    ));
    let send_chat_usecase = Arc::new(SendChatUseCase::new(
        connections.clone(),
        connections.clone(),
        clock.clone(),
    ));
    let message_router = Arc::new(MessageRouter::new(
        config.max_payload_bytes,
        join_room_usecase,
        publish_display_usecase,
        send_chat_usecase,
    ));
    let heartbeat = Arc::new(HeartbeatMonitor::new(
        connections.clone(),
        connections.clone(),
        presence,
        clock,
        config.heartbeat_interval,
    ));
    let get_rooms_usecase = Arc::new(GetRoomsUseCase::new(
        connections.clone(),
        room_states.clone(),
    ));

    // 4. Create AppState
    let app_state = Arc::new(AppState {
        connect_participant_usecase,
        disconnect_participant_usecase,
        message_router,
        heartbeat,
        get_rooms_usecase,
        outbound_buffer: config.outbound_buffer,
    });

    // 5. Create the server
    Server::new(config, app_state, connections, persistence, persistence_task)
}
