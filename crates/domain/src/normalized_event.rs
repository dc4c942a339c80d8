//! The normalizer's output: a `RawEvent` with timestamps normalized to UTC,
//! numeric coercion attempted, and a handful of derived fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use telemetry_common::CorrelationId;

use crate::raw_event::Context;

/// One of the three entity categories Home Assistant-style hubs report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Regular,
    Diagnostic,
    Config,
}

impl EntityCategory {
    /// Derive from the `entity_category` attribute, if present; entities
    /// without one are `Regular`.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("diagnostic") => EntityCategory::Diagnostic,
            Some("config") => EntityCategory::Config,
            _ => EntityCategory::Regular,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::Regular => "regular",
            EntityCategory::Diagnostic => "diagnostic",
            EntityCategory::Config => "config",
        }
    }
}

/// A normalized state snapshot (carried for both old and new state).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedState {
    pub state: String,
    /// `state` coerced to a number when parseable, else `None`.
    pub numeric_state: Option<f64>,
    pub attributes: Map<String, Value>,
    pub last_changed: DateTime<Utc>,
}

/// Superset of `RawEvent` produced by the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub event_type: String,
    pub entity_id: String,
    pub domain: String,
    pub old_state: Option<NormalizedState>,
    pub new_state: NormalizedState,
    pub device_class: Option<String>,
    pub area_id: Option<String>,
    pub device_id: Option<String>,
    pub friendly_name: Option<String>,
    pub unit_of_measurement: Option<String>,
    pub integration: Option<String>,
    pub entity_category: EntityCategory,
    /// Seconds between `new_state.last_changed` and `old_state.last_changed`.
    /// `None` when there is no prior state (first-seen entity).
    pub duration_in_state_seconds: Option<f64>,
    pub time_fired: DateTime<Utc>,
    pub origin: String,
    pub context: Context,
    pub correlation_id: CorrelationId,
}

impl NormalizedEvent {
    /// Derive the domain prefix of an `entity_id` (everything before the
    /// first `.`).
    pub fn domain_of(entity_id: &str) -> String {
        entity_id
            .split_once('.')
            .map(|(domain, _)| domain.to_string())
            .unwrap_or_else(|| entity_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_of_splits_on_first_dot() {
        assert_eq!(NormalizedEvent::domain_of("light.kitchen"), "light");
        assert_eq!(
            NormalizedEvent::domain_of("sensor.living_room.temp"),
            "sensor"
        );
    }

    #[test]
    fn domain_of_entity_without_dot_is_itself() {
        assert_eq!(NormalizedEvent::domain_of("unknown"), "unknown");
    }

    #[test]
    fn entity_category_defaults_to_regular() {
        assert_eq!(EntityCategory::from_attribute(None), EntityCategory::Regular);
        assert_eq!(
            EntityCategory::from_attribute(Some("diagnostic")),
            EntityCategory::Diagnostic
        );
        assert_eq!(
            EntityCategory::from_attribute(Some("bogus")),
            EntityCategory::Regular
        );
    }
}
