//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{
    infrastructure::dto::{conversion::room_summary, http::RoomSummaryDto},
    ui::state::AppState,
};

pub const BANNER: &str = "ARCHEI realtime WS OK";

/// Plain-text liveness banner
pub async fn banner() -> &'static str {
    BANNER
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of rooms that have display state or members
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.get_rooms_usecase.execute().await;

    // Domain Model から DTO への変換
    let summaries = rooms
        .iter()
        .map(|overview| room_summary(&overview.room, overview.state.as_ref(), &overview.members))
        .collect();

    Json(summaries)
}
