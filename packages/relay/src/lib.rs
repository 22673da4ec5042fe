//! Realtime room relay for the Archei tabletop companion.
//!
//! Browser connections are grouped into rooms. A game master publishes display
//! state (scene, countdown, clocks, initiative) that is kept per room, replayed to
//! late joiners and persisted to a JSON snapshot; chat and presence are relayed
//! to everyone in the room.

pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
