//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use thiserror::Error;
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::trace::TraceLayer;

use crate::{
    config::RelayConfig,
    domain::MessagePusher,
    infrastructure::persistence::PersistenceHandle,
    usecase::HeartbeatMonitor,
};

use super::{
    handler::{banner, get_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Realtime relay server
///
/// Owns the HTTP/WebSocket application, the heartbeat monitor and the handle to the
/// persistence actor. Built by [`crate::bootstrap::build_server`].
///
/// # Example
///
/// ```ignore
/// let server = build_server(RelayConfig::from_env()?).await;
/// server.run().await?;
/// ```
pub struct Server {
    config: RelayConfig,
    app: Router,
    heartbeat: Arc<HeartbeatMonitor>,
    message_pusher: Arc<dyn MessagePusher>,
    persistence: PersistenceHandle,
    persistence_task: JoinHandle<()>,
}

impl Server {
    pub fn new(
        config: RelayConfig,
        app_state: Arc<AppState>,
        message_pusher: Arc<dyn MessagePusher>,
        persistence: PersistenceHandle,
        persistence_task: JoinHandle<()>,
    ) -> Self {
        let heartbeat = app_state.heartbeat.clone();

        // Define handlers
        let app = Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/", get(banner))
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .with_state(app_state)
            .layer(TraceLayer::new_for_http());

        Self {
            config,
            app,
            heartbeat,
            message_pusher,
            persistence,
            persistence_task,
        }
    }

    /// Bind the configured address and serve until SIGINT/SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        tracing::info!("Press Ctrl+C to shutdown gracefully");
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves.
    ///
    /// On shutdown every socket is closed, the heartbeat stops and a final snapshot
    /// flush runs before this returns.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!("Realtime relay listening on {}", local_addr);
        tracing::info!("Connect to: ws://{}/ws?room={}", local_addr, crate::domain::RoomId::DEFAULT);

        let heartbeat_task = tokio::spawn(self.heartbeat.clone().run());

        let message_pusher = self.message_pusher.clone();
        let graceful = async move {
            shutdown.await;
            let closed = message_pusher.terminate_all().await;
            tracing::info!("Closing {} connections", closed);
        };

        let result = axum::serve(listener, self.app)
            .with_graceful_shutdown(graceful)
            .await;

        heartbeat_task.abort();

        match self.persistence.shutdown_flush().await {
            Ok(outcome) => tracing::debug!("Final flush: {:?}", outcome),
            Err(e) => tracing::error!("Final flush failed: {}", e),
        }
        if let Err(e) = self.persistence_task.await {
            tracing::warn!("Persistence scheduler ended abnormally: {}", e);
        }

        tracing::info!("Server shutdown complete");
        result.map_err(ServerError::from)
    }
}
