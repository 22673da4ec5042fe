//! In-memory implementations of the domain repositories.

pub mod connection;
pub mod room_state;

pub use connection::InMemoryConnectionRepository;
pub use room_state::InMemoryRoomStateRepository;
