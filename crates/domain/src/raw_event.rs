//! The event shape as it arrives from the hub, before normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single state record embedded in a `state_changed` event's `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    pub last_changed: DateTime<Utc>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// The hub's per-event context block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// The `data` payload of a `state_changed` event.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawEventData {
    pub entity_id: Option<String>,
    pub old_state: Option<StateRecord>,
    pub new_state: Option<StateRecord>,
}

/// The event exactly as received over the hub WebSocket's `event`
/// envelope. Discarded once `normalize` produces a `NormalizedEvent`; the
/// raw form is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub event_type: String,
    #[serde(default)]
    pub data: RawEventData,
    pub time_fired: DateTime<Utc>,
    #[serde(default)]
    pub origin: String,
    pub context: Context,
}
