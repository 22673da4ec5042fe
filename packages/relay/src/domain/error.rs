//! Domain layer errors.

use thiserror::Error;

/// 値オブジェクト生成時のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("Room ID must not be empty")]
    RoomIdEmpty,

    #[error("Nickname must not be empty")]
    NicknameEmpty,

    #[error("Unknown role: '{0}'")]
    UnknownRole(String),

    #[error("Invalid connection ID: '{0}'")]
    InvalidConnectionId(String),
}

/// Repository 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Connection '{0}' is not registered")]
    ConnectionNotFound(String),
}

/// MessagePusher 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Client '{0}' not found")]
    ClientNotFound(String),

    #[error("Outbound buffer for client '{0}' is full")]
    BufferFull(String),

    #[error("Failed to push message: {0}")]
    PushFailed(String),
}

/// スナップショット永続化のエラー
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence scheduler is not running")]
    SchedulerStopped,
}
