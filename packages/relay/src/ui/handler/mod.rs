//! HTTP and WebSocket handlers.

pub mod http;
pub mod websocket;

pub use http::{banner, get_rooms, health_check};
pub use websocket::websocket_handler;
