//! Hub WebSocket frame shapes and parsing.

use serde::Deserialize;
use serde_json::Value;
use telemetry_domain::RawEvent;

#[derive(Debug, PartialEq)]
pub enum InboundFrame {
    AuthRequired,
    AuthOk,
    AuthInvalid { message: String },
    Event(Box<RawEvent>),
    Result { id: u64, success: bool },
    Pong,
    Unknown,
}

#[derive(Deserialize)]
struct EventEnvelope {
    event: RawEvent,
}

#[derive(Deserialize)]
struct ResultEnvelope {
    id: u64,
    success: bool,
}

#[derive(Deserialize)]
struct AuthInvalidEnvelope {
    #[serde(default)]
    message: String,
}

/// Parse one text frame from the hub into a typed `InboundFrame`.
pub fn parse_frame(text: &str) -> Result<InboundFrame, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    let frame_type = value.get("type").and_then(Value::as_str).unwrap_or("");

    Ok(match frame_type {
        "auth_required" => InboundFrame::AuthRequired,
        "auth_ok" => InboundFrame::AuthOk,
        "auth_invalid" => {
            let envelope: AuthInvalidEnvelope = serde_json::from_value(value)?;
            InboundFrame::AuthInvalid {
                message: envelope.message,
            }
        }
        "event" => {
            let envelope: EventEnvelope = serde_json::from_value(value)?;
            InboundFrame::Event(Box::new(envelope.event))
        }
        "result" => {
            let envelope: ResultEnvelope = serde_json::from_value(value)?;
            InboundFrame::Result {
                id: envelope.id,
                success: envelope.success,
            }
        }
        "pong" => InboundFrame::Pong,
        _ => InboundFrame::Unknown,
    })
}

/// Build the `{type:"auth", access_token:<T>}` frame.
pub fn auth_frame(token: &str) -> String {
    serde_json::json!({ "type": "auth", "access_token": token }).to_string()
}

/// Build the `{type:"subscribe_events", id:N, event_type:"state_changed"}` frame.
pub fn subscribe_frame(id: u64) -> String {
    serde_json::json!({
        "type": "subscribe_events",
        "id": id,
        "event_type": "state_changed",
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_auth_required() {
        let frame = parse_frame(r#"{"type":"auth_required"}"#).unwrap();
        assert_eq!(frame, InboundFrame::AuthRequired);
    }

    #[test]
    fn parses_auth_invalid_with_message() {
        let frame = parse_frame(r#"{"type":"auth_invalid","message":"bad token"}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::AuthInvalid {
                message: "bad token".to_string()
            }
        );
    }

    #[test]
    fn parses_result_frame() {
        let frame = parse_frame(r#"{"type":"result","id":1,"success":true}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Result {
                id: 1,
                success: true
            }
        );
    }

    #[test]
    fn parses_state_changed_event() {
        let text = r#"{"type":"event","event":{"event_type":"state_changed","time_fired":"2025-01-02T03:04:05.000Z","origin":"LOCAL","context":{"id":"ctx-1"},"data":{"entity_id":"light.kitchen","old_state":{"state":"off","last_changed":"2025-01-02T03:00:00Z","attributes":{}},"new_state":{"state":"on","last_changed":"2025-01-02T03:04:05Z","attributes":{"friendly_name":"Kitchen"}}}}}"#;
        let frame = parse_frame(text).unwrap();
        match frame {
            InboundFrame::Event(event) => {
                assert_eq!(event.event_type, "state_changed");
                assert_eq!(event.data.entity_id.as_deref(), Some("light.kitchen"));
            }
            other => panic!("expected Event frame, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_does_not_error() {
        let frame = parse_frame(r#"{"type":"pong"}"#).unwrap();
        assert_eq!(frame, InboundFrame::Pong);
    }
}
