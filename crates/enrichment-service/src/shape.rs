//! Shaping: turn an `EnrichedEvent`
//! into a `TimeSeriesPoint` with the closed tag set and an open field set,
//! flattening attributes with an `attr_` prefix while preserving type.

use chrono::{Timelike, Utc};
use serde_json::Value;
use telemetry_domain::{EnrichedEvent, FieldValue, ProviderFields, TagKey, TimeSeriesPoint};

const MEASUREMENT: &str = "home_assistant_events";

fn time_of_day(hour: u32) -> &'static str {
    match hour {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=20 => "evening",
        _ => "night",
    }
}

fn weather_condition(enriched: &EnrichedEvent) -> Option<String> {
    enriched.providers.weather.as_ref().and_then(|reading| {
        if let ProviderFields::Weather(fields) = &reading.fields {
            Some(fields.condition.clone())
        } else {
            None
        }
    })
}

/// Build the canonical `home_assistant_events` point from an enriched
/// event.
pub fn shape(enriched: &EnrichedEvent) -> TimeSeriesPoint {
    let event = &enriched.event;
    let hour = event.time_fired.with_timezone(&Utc).hour();

    let mut point = TimeSeriesPoint::new(MEASUREMENT, event.time_fired)
        .tag(TagKey::EntityId, event.entity_id.clone())
        .tag(TagKey::Domain, event.domain.clone())
        .tag(TagKey::EventType, event.event_type.clone())
        .tag(TagKey::EntityCategory, event.entity_category.as_str())
        .tag(TagKey::TimeOfDay, time_of_day(hour));

    if let Some(device_class) = &event.device_class {
        point = point.tag(TagKey::DeviceClass, device_class.clone());
    }
    if let Some(device_id) = &event.device_id {
        point = point.tag(TagKey::DeviceId, device_id.clone());
    }
    if let Some(area_id) = &event.area_id {
        point = point.tag(TagKey::AreaId, area_id.clone());
    }
    if let Some(integration) = &event.integration {
        point = point.tag(TagKey::Integration, integration.clone());
    }
    if let Some(condition) = weather_condition(enriched) {
        point = point.tag(TagKey::WeatherCondition, condition);
    }

    point = point.field("state", event.new_state.state.clone());
    if let Some(old_state) = &event.old_state {
        point = point.field("old_state", old_state.state.clone());
    }
    point = point.field("context_id", event.context.id.clone());
    if let Some(parent_id) = &event.context.parent_id {
        point = point.field("context_parent_id", parent_id.clone());
    }
    if let Some(user_id) = &event.context.user_id {
        point = point.field("context_user_id", user_id.clone());
    }
    if let Some(duration) = event.duration_in_state_seconds {
        point = point.field("duration_in_state_seconds", duration);
    }
    if let Some(friendly_name) = &event.friendly_name {
        point = point.field("friendly_name", friendly_name.clone());
    }
    if let Some(unit) = &event.unit_of_measurement {
        point = point.field("unit_of_measurement", unit.clone());
    }

    for key in ["icon", "manufacturer", "model", "sw_version"] {
        if let Some(value) = event.new_state.attributes.get(key).and_then(Value::as_str) {
            point = point.field(key, value.to_string());
        }
    }

    if let Some(reading) = &enriched.providers.weather {
        if let ProviderFields::Weather(fields) = &reading.fields {
            point = point
                .field("weather_temp", fields.temperature_c)
                .field("weather_humidity", fields.humidity_pct)
                .field("weather_pressure", fields.pressure_hpa)
                .field("wind_speed", fields.wind_speed_ms)
                .field("weather_description", fields.description.clone());
        }
    }

    for (key, value) in &event.new_state.attributes {
        let field_name = format!("attr_{key}");
        match value {
            Value::String(s) => point = point.field(field_name, s.clone()),
            Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    point = point.field(field_name, f);
                }
            }
            Value::Bool(b) => point = point.field(field_name, *b),
            _ => {}
        }
    }

    point
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use telemetry_domain::{Context, EntityCategory, EnrichedEvent, NormalizedEvent, NormalizedState, ProviderSnapshot};

    fn happy_path_event() -> EnrichedEvent {
        let time_fired: DateTime<Utc> = "2025-01-02T03:04:05Z".parse().unwrap();
        let event = NormalizedEvent {
            event_type: "state_changed".to_string(),
            entity_id: "light.kitchen".to_string(),
            domain: "light".to_string(),
            old_state: Some(NormalizedState {
                state: "off".to_string(),
                numeric_state: None,
                attributes: Default::default(),
                last_changed: "2025-01-02T03:00:00Z".parse().unwrap(),
            }),
            new_state: NormalizedState {
                state: "on".to_string(),
                numeric_state: None,
                attributes: serde_json::Map::from_iter([
                    ("device_class".to_string(), json!("light")),
                    ("friendly_name".to_string(), json!("Kitchen")),
                ]),
                last_changed: time_fired,
            },
            device_class: Some("light".to_string()),
            area_id: None,
            device_id: None,
            friendly_name: Some("Kitchen".to_string()),
            unit_of_measurement: None,
            integration: None,
            entity_category: EntityCategory::Regular,
            duration_in_state_seconds: Some(245.0),
            time_fired,
            origin: "LOCAL".to_string(),
            context: Context {
                id: "ctx-1".to_string(),
                parent_id: None,
                user_id: None,
            },
            correlation_id: telemetry_common::CorrelationId::generate(),
        };
        EnrichedEvent::new(event, ProviderSnapshot::default())
    }

    #[test]
    fn shapes_happy_path_scenario() {
        let point = shape(&happy_path_event());
        assert_eq!(point.measurement, "home_assistant_events");
        assert_eq!(point.tags.get(&TagKey::EntityId).unwrap(), "light.kitchen");
        assert_eq!(point.tags.get(&TagKey::Domain).unwrap(), "light");
        assert_eq!(point.tags.get(&TagKey::TimeOfDay).unwrap(), "night");
        assert_eq!(
            point.fields.get("duration_in_state_seconds").unwrap(),
            &FieldValue::Float(245.0)
        );
        assert_eq!(
            point.fields.get("friendly_name").unwrap(),
            &FieldValue::String("Kitchen".to_string())
        );
        assert_eq!(
            point.fields.get("attr_friendly_name").unwrap(),
            &FieldValue::String("Kitchen".to_string())
        );
    }
}
