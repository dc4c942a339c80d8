//! Intake validation: a closed set of rejection reasons
//! rather than bare strings, so the HTTP response body and the metrics
//! label share one vocabulary.

use serde::Serialize;
use serde_json::Value;
use telemetry_domain::RawEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case", tag = "error")]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: String },
    #[error("malformed timestamp in field: {field}")]
    MalformedTimestamp { field: String },
    #[error("unknown event type: {event_type}")]
    UnknownEventType { event_type: String },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingField { .. } => "missing_field",
            ValidationError::MalformedTimestamp { .. } => "malformed_timestamp",
            ValidationError::UnknownEventType { .. } => "unknown_event_type",
        }
    }
}

const SUPPORTED_EVENT_TYPES: &[&str] = &["state_changed"];

/// Validate a raw intake payload and, on success, return the parsed
/// `RawEvent` (requires `event_type`, `time_fired`, and for
/// `state_changed` both `entity_id` and `new_state.state`).
pub fn validate(body: &Value) -> Result<RawEvent, ValidationError> {
    let event_type = body
        .get("event_type")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::MissingField {
            field: "event_type".to_string(),
        })?;

    if !SUPPORTED_EVENT_TYPES.contains(&event_type) {
        return Err(ValidationError::UnknownEventType {
            event_type: event_type.to_string(),
        });
    }

    let time_fired_raw = body
        .get("time_fired")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::MissingField {
            field: "time_fired".to_string(),
        })?;

    if chrono::DateTime::parse_from_rfc3339(time_fired_raw).is_err() {
        return Err(ValidationError::MalformedTimestamp {
            field: "time_fired".to_string(),
        });
    }

    let data = body.get("data").unwrap_or(&Value::Null);
    let entity_id = data.get("entity_id").and_then(Value::as_str);
    if entity_id.is_none() {
        return Err(ValidationError::MissingField {
            field: "data.entity_id".to_string(),
        });
    }

    let new_state_value = data
        .get("new_state")
        .and_then(Value::as_object)
        .and_then(|state| state.get("state"))
        .and_then(Value::as_str);
    if new_state_value.is_none() {
        return Err(ValidationError::MissingField {
            field: "data.new_state.state".to_string(),
        });
    }

    serde_json::from_value(body.clone()).map_err(|_| ValidationError::MalformedTimestamp {
        field: "time_fired".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_malformed_timestamp() {
        let body = json!({ "event_type": "state_changed", "time_fired": "not-a-date" });
        let err = validate(&body).unwrap_err();
        assert_eq!(err.code(), "malformed_timestamp");
    }

    #[test]
    fn rejects_unknown_event_type() {
        let body = json!({ "event_type": "automation_triggered", "time_fired": "2025-01-02T03:04:05Z" });
        let err = validate(&body).unwrap_err();
        assert_eq!(err.code(), "unknown_event_type");
    }

    #[test]
    fn rejects_missing_entity_id() {
        let body = json!({
            "event_type": "state_changed",
            "time_fired": "2025-01-02T03:04:05Z",
            "data": { "new_state": { "state": "on" } }
        });
        let err = validate(&body).unwrap_err();
        assert_eq!(err.code(), "missing_field");
    }

    #[test]
    fn accepts_well_formed_state_changed_event() {
        let body = json!({
            "event_type": "state_changed",
            "time_fired": "2025-01-02T03:04:05.000Z",
            "context": { "id": "ctx-1" },
            "data": {
                "entity_id": "light.kitchen",
                "new_state": {
                    "state": "on",
                    "last_changed": "2025-01-02T03:04:05Z",
                    "attributes": {}
                }
            }
        });
        let event = validate(&body).expect("should validate");
        assert_eq!(event.event_type, "state_changed");
    }
}
