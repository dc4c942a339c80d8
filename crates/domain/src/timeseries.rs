//! TimeSeriesPoint / WriteBatch.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed tag set. Kept as an enum rather than a bare string key so
/// a caller can't accidentally widen the tag set at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKey {
    EntityId,
    Domain,
    DeviceClass,
    EventType,
    DeviceId,
    AreaId,
    EntityCategory,
    Integration,
    TimeOfDay,
    WeatherCondition,
}

impl TagKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKey::EntityId => "entity_id",
            TagKey::Domain => "domain",
            TagKey::DeviceClass => "device_class",
            TagKey::EventType => "event_type",
            TagKey::DeviceId => "device_id",
            TagKey::AreaId => "area_id",
            TagKey::EntityCategory => "entity_category",
            TagKey::Integration => "integration",
            TagKey::TimeOfDay => "time_of_day",
            TagKey::WeatherCondition => "weather_condition",
        }
    }
}

/// An open field value: strings, floats, bools, or ints, preserving the
/// attribute's original type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// A single point to be written to the TimeSeriesStore, measurement name
/// `home_assistant_events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub measurement: String,
    pub tags: BTreeMap<TagKey, String>,
    pub fields: BTreeMap<String, FieldValue>,
    /// Nanosecond precision UTC, sourced from `time_fired`.
    pub timestamp_ns: i64,
}

impl TimeSeriesPoint {
    pub fn new(measurement: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp_ns: timestamp.timestamp_nanos_opt().unwrap_or_default(),
        }
    }

    pub fn tag(mut self, key: TagKey, value: impl Into<String>) -> Self {
        self.tags.insert(key, value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// An ordered, immutable-once-flushed sequence of points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteBatch {
    pub id: Uuid,
    pub points: Vec<TimeSeriesPoint>,
    pub first_enqueued_at: DateTime<Utc>,
}

impl WriteBatch {
    pub fn new(points: Vec<TimeSeriesPoint>, first_enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            first_enqueued_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_tags_and_fields() {
        let ts = Utc::now();
        let point = TimeSeriesPoint::new("home_assistant_events", ts)
            .tag(TagKey::EntityId, "light.kitchen")
            .tag(TagKey::Domain, "light")
            .field("state", "on")
            .field("duration_in_state_seconds", 245.0);

        assert_eq!(point.tags.get(&TagKey::EntityId).unwrap(), "light.kitchen");
        assert_eq!(point.fields.get("state").unwrap(), &FieldValue::String("on".into()));
        assert_eq!(
            point.fields.get("duration_in_state_seconds").unwrap(),
            &FieldValue::Float(245.0)
        );
    }
}
