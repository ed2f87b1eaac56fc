//! Shared handles the request handlers operate on.

use std::sync::Arc;

use wakeroom_core::{
    AttendanceManager, Broadcaster, MemoryIdentityDirectory, MemoryRoomDirectory, SessionRegistry,
};

/// Everything a handler needs, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub broadcaster: Broadcaster,
    pub attendance: AttendanceManager,
    pub identities: Arc<MemoryIdentityDirectory>,
    pub rooms: Arc<MemoryRoomDirectory>,
    /// Per-connection outbound chat buffer, in messages.
    pub chat_buffer: usize,
}
