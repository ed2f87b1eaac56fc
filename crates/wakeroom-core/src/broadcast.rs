//! Room-wide event fan-out on top of the session registry.

use serde::Serialize;
use tracing::warn;

use wakeroom_common::clock;

use crate::protocol::ServerEvent;
use crate::registry::SessionRegistry;

/// Serializes a payload once and routes it to every live connection in a
/// room. Delivery failures stay inside the registry; serialization failures
/// are logged and dropped. A broadcast never raises to its caller.
#[derive(Clone)]
pub struct Broadcaster {
    registry: SessionRegistry,
}

impl Broadcaster {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    /// Send a payload to a room. Returns the number of accepted deliveries.
    pub async fn broadcast<T: Serialize>(&self, room_id: &str, payload: &T) -> usize {
        match serde_json::to_string(payload) {
            Ok(text) => self.registry.broadcast_text(room_id, &text).await,
            Err(e) => {
                warn!(room_id, error = %e, "broadcast payload failed to serialize");
                0
            }
        }
    }

    /// Announce a system event (join/leave notices and the like).
    pub async fn system(&self, room_id: &str, message: impl Into<String>) -> usize {
        let event = ServerEvent::System {
            message: message.into(),
            timestamp: clock::now_stamp(),
        };
        self.broadcast(room_id, &event).await
    }

    /// Fire the wake-up trigger event. This rides an explicit room-owner
    /// action; the attendance evaluator never emits it.
    pub async fn wake_up(&self, room_id: &str, message: impl Into<String>) -> usize {
        let event = ServerEvent::WakeUpStart {
            message: message.into(),
            timestamp: clock::now_stamp(),
        };
        self.broadcast(room_id, &event).await
    }
}
