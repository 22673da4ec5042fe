//! UseCase 層のエラー定義

use thiserror::Error;

/// `join` 処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRoomError {
    #[error("Connection '{0}' is not registered")]
    ConnectionNotFound(String),
}

/// `DISPLAY_*` 公開処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishDisplayError {
    #[error("Connection '{0}' is not registered")]
    ConnectionNotFound(String),

    #[error("Connection '{0}' is not a game master")]
    NotGameMaster(String),
}

/// `chat:*` 送信処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendChatError {
    #[error("Connection '{0}' is not registered")]
    ConnectionNotFound(String),
}
