//! On-disk snapshot layout.
//!
//! ```json
//! {
//!   "sceneByRoom": { "<room>": { "t": "DISPLAY_SCENE_STATE", ... } },
//!   "countdownByRoom": { ... },
//!   "clocksByRoom": { ... },
//!   "initiativeByRoom": { ... }
//! }
//! ```
//!
//! Maps are `BTreeMap`s so the same state always serializes to the same bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot file contents. A missing map loads as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    #[serde(default)]
    pub scene_by_room: BTreeMap<String, Value>,
    #[serde(default)]
    pub countdown_by_room: BTreeMap<String, Value>,
    #[serde(default)]
    pub clocks_by_room: BTreeMap<String, Value>,
    #[serde(default)]
    pub initiative_by_room: BTreeMap<String, Value>,
}
