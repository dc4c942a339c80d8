//! The normalizer: turns a validated `RawEvent` into a
//! `NormalizedEvent` — UTC timestamps, numeric coercion, derived fields,
//! and a correlation id.

use telemetry_common::CorrelationId;
use telemetry_domain::{EntityCategory, NormalizedEvent, NormalizedState, RawEvent};

const WARN_DURATION_THRESHOLD_SECONDS: f64 = 7.0 * 24.0 * 3600.0;

/// Normalize a `RawEvent`, propagating an inbound correlation id (from an
/// HTTP header, passed in by the caller) or minting a fresh one.
pub fn normalize(raw: RawEvent, inbound_correlation_id: Option<&str>) -> NormalizedEvent {
    let entity_id = raw.data.entity_id.clone().unwrap_or_default();
    let domain = NormalizedEvent::domain_of(&entity_id);

    let new_state = raw
        .data
        .new_state
        .as_ref()
        .map(|state| NormalizedState {
            state: state.state.clone(),
            numeric_state: state.state.parse::<f64>().ok(),
            attributes: state.attributes.clone(),
            last_changed: state.last_changed,
        })
        .unwrap_or_else(|| NormalizedState {
            state: String::new(),
            numeric_state: None,
            attributes: serde_json::Map::new(),
            last_changed: raw.time_fired,
        });

    let old_state = raw.data.old_state.as_ref().map(|state| NormalizedState {
        state: state.state.clone(),
        numeric_state: state.state.parse::<f64>().ok(),
        attributes: state.attributes.clone(),
        last_changed: state.last_changed,
    });

    let duration_in_state_seconds = old_state.as_ref().map(|old| {
        let duration = (new_state.last_changed - old.last_changed).num_milliseconds() as f64 / 1000.0;
        if duration > WARN_DURATION_THRESHOLD_SECONDS {
            tracing::warn!(
                entity_id = %entity_id,
                duration_in_state_seconds = duration,
                "duration_in_state_seconds exceeds warn threshold"
            );
        }
        duration
    });

    let device_class = new_state
        .attributes
        .get("device_class")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let area_id = new_state
        .attributes
        .get("area_id")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let device_id = new_state
        .attributes
        .get("device_id")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let friendly_name = new_state
        .attributes
        .get("friendly_name")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let unit_of_measurement = new_state
        .attributes
        .get("unit_of_measurement")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let integration = new_state
        .attributes
        .get("integration")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let entity_category = EntityCategory::from_attribute(
        new_state
            .attributes
            .get("entity_category")
            .and_then(|v| v.as_str()),
    );

    let correlation_id = inbound_correlation_id
        .map(CorrelationId::from)
        .unwrap_or_else(CorrelationId::generate);

    NormalizedEvent {
        event_type: raw.event_type,
        entity_id,
        domain,
        old_state,
        new_state,
        device_class,
        area_id,
        device_id,
        friendly_name,
        unit_of_measurement,
        integration,
        entity_category,
        duration_in_state_seconds,
        time_fired: raw.time_fired,
        origin: raw.origin,
        context: raw.context,
        correlation_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use telemetry_domain::{Context, RawEventData, StateRecord};

    fn sample_raw() -> RawEvent {
        RawEvent {
            event_type: "state_changed".to_string(),
            data: RawEventData {
                entity_id: Some("light.kitchen".to_string()),
                old_state: Some(StateRecord {
                    state: "off".to_string(),
                    attributes: Default::default(),
                    last_changed: "2025-01-02T03:00:00Z".parse().unwrap(),
                    last_updated: None,
                }),
                new_state: Some(StateRecord {
                    state: "on".to_string(),
                    attributes: serde_json::Map::from_iter([(
                        "friendly_name".to_string(),
                        json!("Kitchen"),
                    )]),
                    last_changed: "2025-01-02T03:04:05Z".parse().unwrap(),
                    last_updated: None,
                }),
            },
            time_fired: "2025-01-02T03:04:05Z".parse().unwrap(),
            origin: "LOCAL".to_string(),
            context: Context {
                id: "ctx-1".to_string(),
                parent_id: None,
                user_id: None,
            },
        }
    }

    #[test]
    fn derives_domain_and_duration() {
        let event = normalize(sample_raw(), None);
        assert_eq!(event.domain, "light");
        assert_eq!(event.duration_in_state_seconds, Some(245.0));
        assert_eq!(event.friendly_name.as_deref(), Some("Kitchen"));
    }

    #[test]
    fn propagates_inbound_correlation_id() {
        let event = normalize(sample_raw(), Some("req-42"));
        assert_eq!(event.correlation_id.as_str(), "req-42");
    }

    #[test]
    fn first_seen_entity_has_null_duration() {
        let mut raw = sample_raw();
        raw.data.old_state = None;
        let event = normalize(raw, None);
        assert!(event.duration_in_state_seconds.is_none());
    }

    #[test]
    fn normalize_is_idempotent_on_already_normalized_fields() {
        let first = normalize(sample_raw(), Some("ctx-1"));
        let mut reraw = sample_raw();
        reraw.context.id = first.correlation_id.to_string();
        let second = normalize(reraw, Some(first.correlation_id.as_str()));
        assert_eq!(first.domain, second.domain);
        assert_eq!(
            first.duration_in_state_seconds,
            second.duration_in_state_seconds
        );
    }
}
