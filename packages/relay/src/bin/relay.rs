//! Realtime room relay.
//!
//! Serves WebSocket connections on `/ws?room=<id>` and persists room display state
//! under `DATA_DIR`.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin archei-relay
//! PORT=9000 DATA_DIR=/var/lib/archei cargo run --bin archei-relay
//! ```

use archei_relay::{bootstrap::build_server, config::RelayConfig};
use archei_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_PKG_NAME"), env!("CARGO_BIN_NAME"), "info");

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let server = build_server(config).await;
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
