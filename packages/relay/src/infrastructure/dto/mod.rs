//! Data Transfer Objects (DTOs) for the relay.
//!
//! DTOs are organized by protocol:
//! - `snapshot`: on-disk snapshot file layout
//! - `http`: HTTP API response DTOs

pub mod conversion;
pub mod http;
pub mod snapshot;
