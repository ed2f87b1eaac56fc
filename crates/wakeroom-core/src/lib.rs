pub mod attendance;
pub mod broadcast;
pub mod chat;
pub mod directory;
pub mod protocol;
pub mod registry;

pub use attendance::{AttendanceConfig, AttendanceManager, AttendanceSnapshot};
pub use broadcast::Broadcaster;
pub use chat::ChatSession;
pub use directory::{
    AttendanceLog, IdentityDirectory, MemoryAttendanceLog, MemoryIdentityDirectory,
    MemoryRoomDirectory, Room, RoomDirectory, UserProfile, Verdict,
};
pub use protocol::{ChatEnvelope, ServerEvent};
pub use registry::{RoomConnection, SessionRegistry};
