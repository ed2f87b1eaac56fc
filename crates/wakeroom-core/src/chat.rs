//! Per-connection chat protocol handler.
//!
//! A connection moves `CONNECTING → ACTIVE → CLOSED`: [`ChatSession::open`]
//! registers the connection and announces the join, [`ChatSession::handle_inbound`]
//! relays stamped messages, [`ChatSession::close`] unregisters and announces
//! the leave. `CLOSED` is terminal; a reconnect is a new session.

use tokio::sync::mpsc;
use tracing::{debug, info};

use wakeroom_common::{clock, ConnectionId, SessionError};

use crate::broadcast::Broadcaster;
use crate::directory::IdentityDirectory;
use crate::protocol::ChatEnvelope;
use crate::registry::{RoomConnection, SessionRegistry};

/// Display name used when the identity store cannot resolve the principal.
const FALLBACK_NAME: &str = "unknown";

/// One live chat connection's server-side state.
pub struct ChatSession {
    registry: SessionRegistry,
    broadcaster: Broadcaster,
    conn_id: ConnectionId,
    room_id: String,
    user_id: String,
    display_name: String,
    avatar_url: Option<String>,
}

impl ChatSession {
    /// Accept a connection into a room.
    ///
    /// Resolves the principal's profile for a display name (an identity
    /// store failure falls back to a placeholder and never blocks the
    /// connection), then registers the outbound channel and announces the
    /// join. Returns the session and the receiver the transport drains.
    pub async fn open(
        registry: SessionRegistry,
        broadcaster: Broadcaster,
        identities: &dyn IdentityDirectory,
        room_id: &str,
        user_id: &str,
        outbound_capacity: usize,
    ) -> (Self, mpsc::Receiver<String>) {
        let (display_name, avatar_url) = match identities.profile(user_id).await {
            Ok(profile) => (profile.display_name, profile.avatar_url),
            Err(e) => {
                debug!(user_id, error = %e, "identity lookup failed, using placeholder");
                (FALLBACK_NAME.to_string(), None)
            }
        };

        let (tx, rx) = mpsc::channel(outbound_capacity);
        let conn_id = ConnectionId::new();
        registry
            .register(
                room_id,
                RoomConnection {
                    id: conn_id.clone(),
                    tx,
                },
            )
            .await;

        info!(room_id, user_id, conn = %conn_id, "chat connection opened");
        broadcaster
            .system(room_id, format!("{display_name} joined the room"))
            .await;

        let session = Self {
            registry,
            broadcaster,
            conn_id,
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            display_name,
            avatar_url,
        };
        (session, rx)
    }

    /// Relay one inbound frame to the room.
    ///
    /// The envelope passes through verbatim, unrecognized fields intact,
    /// with the server receive time stamped on and, when the profile
    /// carries one, the sender's avatar. A payload that does not parse is a
    /// protocol violation; the caller must close the session.
    pub async fn handle_inbound(&self, text: &str) -> Result<(), SessionError> {
        let mut envelope = ChatEnvelope::parse(text)?;
        envelope.stamp(&clock::now_stamp());
        if let Some(url) = &self.avatar_url {
            envelope.set_profile_image(url);
        }
        self.broadcaster.broadcast(&self.room_id, &envelope).await;
        Ok(())
    }

    /// Tear the session down: unregister (tolerant of duplicate
    /// disconnects) and announce the leave under the name resolved at open.
    pub async fn close(self) {
        self.registry.unregister(&self.room_id, &self.conn_id).await;
        info!(
            room_id = %self.room_id,
            user_id = %self.user_id,
            conn = %self.conn_id,
            "chat connection closed"
        );
        self.broadcaster
            .system(&self.room_id, format!("{} left the room", self.display_name))
            .await;
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.conn_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}
