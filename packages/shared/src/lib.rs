//! Shared utilities for the Archei relay workspace.
//!
//! - `logger`: tracing subscriber setup
//! - `time`: clock abstraction and timestamp helpers

pub mod logger;
pub mod time;
