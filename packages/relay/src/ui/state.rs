//! Shared application state.

use std::sync::Arc;

use crate::usecase::{
    ConnectParticipantUseCase, DisconnectParticipantUseCase, GetRoomsUseCase, HeartbeatMonitor,
    MessageRouter,
};

/// Shared application state
pub struct AppState {
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// 受信フレームの振り分け
    pub message_router: Arc<MessageRouter>,
    /// pong の記録先
    pub heartbeat: Arc<HeartbeatMonitor>,
    /// GetRoomsUseCase（ルーム一覧取得のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// 接続ごとの送信キューの上限（フレーム数）
    pub outbound_buffer: usize,
}
