//! Snapshot persistence: the JSON file store and the debouncing scheduler actor.

pub mod json_file;
pub mod scheduler;

pub use json_file::JsonFileSnapshotStore;
pub use scheduler::{FlushOutcome, PersistenceHandle, PersistenceScheduler, SnapshotFlusher};
