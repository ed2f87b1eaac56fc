//! Live chat connection registry: one ordered set of connections per room.
//!
//! Connections are registered for exactly one room for their lifetime. The
//! registry also owns payload fan-out, since delivery order and isolation
//! are properties of the per-room set.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use wakeroom_common::ConnectionId;

/// A live connection's registry entry. The sender feeds the connection's
/// bounded outbound buffer; the transport task drains the receiving end.
#[derive(Debug, Clone)]
pub struct RoomConnection {
    pub id: ConnectionId,
    pub tx: mpsc::Sender<String>,
}

/// Thread-safe registry of live connections, keyed by room.
#[derive(Clone)]
pub struct SessionRegistry {
    rooms: Arc<RwLock<HashMap<String, Vec<RoomConnection>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a connection to a room's set, creating the set on first use.
    pub async fn register(&self, room_id: &str, conn: RoomConnection) {
        let mut rooms = self.rooms.write().await;
        rooms.entry(room_id.to_string()).or_default().push(conn);
    }

    /// Remove a connection from a room's set. Unknown rooms and absent
    /// connections are silent no-ops; transports can deliver the same
    /// disconnect twice.
    pub async fn unregister(&self, room_id: &str, conn_id: &ConnectionId) {
        let mut rooms = self.rooms.write().await;
        if let Some(conns) = rooms.get_mut(room_id) {
            conns.retain(|c| &c.id != conn_id);
            if conns.is_empty() {
                rooms.remove(room_id);
            }
        }
    }

    /// Snapshot of a room's connections in registration order. The set may
    /// change as soon as this returns.
    pub async fn connections(&self, room_id: &str) -> Vec<RoomConnection> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of live connections in a room.
    pub async fn connection_count(&self, room_id: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Deliver one pre-serialized payload to every connection in a room, in
    /// registration order. Returns the number of accepted deliveries.
    ///
    /// Deliveries are independent: a closed or backlogged connection is
    /// skipped and logged, never surfaced to the caller; its own transport
    /// task notices the disconnect and unregisters it. The exclusive guard
    /// is held across the fan-out so concurrent broadcasts to a room cannot
    /// interleave; every send is a non-blocking `try_send` into that
    /// connection's own buffer, so the guard never waits on a consumer.
    pub async fn broadcast_text(&self, room_id: &str, payload: &str) -> usize {
        let rooms = self.rooms.write().await;
        let Some(conns) = rooms.get(room_id) else {
            return 0;
        };
        let mut delivered = 0;
        for conn in conns {
            match conn.tx.try_send(payload.to_string()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(room_id, conn = %conn.id, error = %e, "chat delivery skipped");
                }
            }
        }
        delivered
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
