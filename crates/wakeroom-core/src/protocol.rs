//! Wire protocol for room chat sessions.
//!
//! Inbound chat payloads are a tagged envelope with an open payload: the
//! `type` discriminant is required, everything else rides along untouched
//! so clients can extend the protocol without a server change. Server-side
//! events use a closed tagged enum.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use wakeroom_common::errors::SessionError;

/// A client chat payload. Unrecognized fields are preserved and relayed
/// verbatim; the server only ever adds its own stamps on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatEnvelope {
    /// Parse an inbound text frame. Anything that is not a JSON object
    /// with a string `type` is a protocol violation.
    pub fn parse(text: &str) -> Result<Self, SessionError> {
        serde_json::from_str(text).map_err(|e| SessionError::ProtocolViolation(e.to_string()))
    }

    /// Stamp the server receive time, overwriting any client-sent value.
    pub fn stamp(&mut self, timestamp: &str) {
        self.extra
            .insert("timestamp".to_string(), Value::String(timestamp.to_string()));
    }

    /// Attach the sender's avatar reference.
    pub fn set_profile_image(&mut self, url: &str) {
        self.extra
            .insert("profile_image".to_string(), Value::String(url.to_string()));
    }
}

/// Events the server originates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Join/leave announcements and other room notices.
    System { message: String, timestamp: String },
    /// The explicit wake-up trigger, fired on a room-owner action.
    WakeUpStart { message: String, timestamp: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_preserves_unknown_fields() {
        let mut envelope =
            ChatEnvelope::parse(r#"{"type":"chat","message":"hi","mood":"sleepy"}"#).unwrap();
        assert_eq!(envelope.kind, "chat");

        envelope.stamp("2025-07-01 06:31:02");
        let out: Value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(out["type"], "chat");
        assert_eq!(out["message"], "hi");
        assert_eq!(out["mood"], "sleepy");
        assert_eq!(out["timestamp"], "2025-07-01 06:31:02");
    }

    #[test]
    fn stamp_overwrites_client_timestamp() {
        let mut envelope =
            ChatEnvelope::parse(r#"{"type":"chat","timestamp":"1999-01-01 00:00:00"}"#).unwrap();
        envelope.stamp("2025-07-01 06:31:02");

        let out: Value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(out["timestamp"], "2025-07-01 06:31:02");
    }

    #[test]
    fn profile_image_is_appended() {
        let mut envelope = ChatEnvelope::parse(r#"{"type":"chat","message":"hi"}"#).unwrap();
        envelope.set_profile_image("https://cdn.example/alice.png");

        let out: Value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(out["profile_image"], "https://cdn.example/alice.png");
    }

    #[test]
    fn malformed_payloads_are_violations() {
        assert!(matches!(
            ChatEnvelope::parse("not json"),
            Err(SessionError::ProtocolViolation(_))
        ));
        assert!(matches!(
            ChatEnvelope::parse(r#"{"message":"no discriminant"}"#),
            Err(SessionError::ProtocolViolation(_))
        ));
        assert!(matches!(
            ChatEnvelope::parse(r#"[1,2,3]"#),
            Err(SessionError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn server_events_are_tagged() {
        let event = ServerEvent::System {
            message: "Alice joined the room".into(),
            timestamp: "2025-07-01 06:30:00".into(),
        };
        let out: Value = serde_json::to_value(&event).unwrap();
        assert_eq!(out["type"], "system");
        assert_eq!(out["message"], "Alice joined the room");

        let event = ServerEvent::WakeUpStart {
            message: "time to wake up".into(),
            timestamp: "2025-07-01 06:30:00".into(),
        };
        let out: Value = serde_json::to_value(&event).unwrap();
        assert_eq!(out["type"], "wake_up_start");
    }
}
