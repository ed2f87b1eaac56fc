//! Collaborator interfaces for the surrounding application.
//!
//! The session core only needs three things from the outside world: who a
//! user is, what a room expects, and somewhere durable to write attendance
//! verdicts. Each is a trait so the host can back it with whatever store it
//! runs; the `Memory*` implementations here back the bundled server binary
//! and the test suite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use wakeroom_common::errors::DirectoryError;

// ---------------------------------------------------------------------------
// Exchange types
// ---------------------------------------------------------------------------

/// Profile attributes the identity store resolves for a principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
    pub points: i64,
    pub avatar_url: Option<String>,
}

/// Room metadata owned by the room directory.
///
/// `participants` is ordered and append-only while the room is open, and is
/// never empty: the directory adds the creator on creation.
#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub room_id: String,
    pub title: String,
    pub wake_date: NaiveDate,
    pub wake_time: NaiveTime,
    pub public: bool,
    pub participants: Vec<String>,
}

/// The durable per-(user, date) attendance outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub user_id: String,
    pub date: NaiveDate,
    pub success: bool,
    pub kind: String,
    pub wake_time: String,
    pub reason: String,
    pub participants: Vec<String>,
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Resolves an authenticated principal to profile attributes.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn profile(&self, user_id: &str) -> Result<UserProfile, DirectoryError>;
}

/// Room metadata lookups and participant appends.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn room(&self, room_id: &str) -> Result<Room, DirectoryError>;

    /// Append a participant. Appending someone already on the list is a
    /// no-op, not an error.
    async fn add_participant(&self, room_id: &str, user_id: &str) -> Result<(), DirectoryError>;
}

/// Durable attendance log, upsert-by-(user, date). A later write for the
/// same key overwrites the earlier one.
#[async_trait]
pub trait AttendanceLog: Send + Sync {
    async fn upsert(&self, verdict: &Verdict) -> Result<(), DirectoryError>;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// In-memory identity store for the bundled server and tests.
#[derive(Clone, Default)]
pub struct MemoryIdentityDirectory {
    users: Arc<RwLock<HashMap<String, UserProfile>>>,
}

impl MemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: UserProfile) {
        self.users
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl IdentityDirectory for MemoryIdentityDirectory {
    async fn profile(&self, user_id: &str) -> Result<UserProfile, DirectoryError> {
        self.users
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| DirectoryError::UserNotFound(user_id.to_string()))
    }
}

/// In-memory room directory for the bundled server and tests.
#[derive(Clone, Default)]
pub struct MemoryRoomDirectory {
    rooms: Arc<RwLock<HashMap<String, Room>>>,
}

impl MemoryRoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, room: Room) {
        self.rooms.write().await.insert(room.room_id.clone(), room);
    }

    pub async fn remove(&self, room_id: &str) {
        self.rooms.write().await.remove(room_id);
    }
}

#[async_trait]
impl RoomDirectory for MemoryRoomDirectory {
    async fn room(&self, room_id: &str) -> Result<Room, DirectoryError> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| DirectoryError::RoomNotFound(room_id.to_string()))
    }

    async fn add_participant(&self, room_id: &str, user_id: &str) -> Result<(), DirectoryError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| DirectoryError::RoomNotFound(room_id.to_string()))?;
        if !room.participants.iter().any(|p| p == user_id) {
            room.participants.push(user_id.to_string());
        }
        Ok(())
    }
}

/// In-memory attendance log. Counts writes so at-most-once behavior is
/// observable in tests.
#[derive(Clone, Default)]
pub struct MemoryAttendanceLog {
    rows: Arc<RwLock<HashMap<(String, NaiveDate), Verdict>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryAttendanceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: &str, date: NaiveDate) -> Option<Verdict> {
        self.rows
            .read()
            .await
            .get(&(user_id.to_string(), date))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Total upserts ever applied, overwrites included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttendanceLog for MemoryAttendanceLog {
    async fn upsert(&self, verdict: &Verdict) -> Result<(), DirectoryError> {
        self.rows
            .write()
            .await
            .insert((verdict.user_id.clone(), verdict.date), verdict.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    fn verdict(user: &str, success: bool, reason: &str) -> Verdict {
        Verdict {
            user_id: user.to_string(),
            date: date(),
            success,
            kind: "group_wakeup".into(),
            wake_time: "06:30".into(),
            reason: reason.into(),
            participants: vec!["alice".into(), "bob".into()],
        }
    }

    fn room(id: &str, participants: Vec<String>) -> Room {
        Room {
            room_id: id.to_string(),
            title: "morning crew".into(),
            wake_date: date(),
            wake_time: NaiveTime::from_hms_opt(6, 30, 0).unwrap(),
            public: true,
            participants,
        }
    }

    #[tokio::test]
    async fn identity_lookup_and_miss() {
        let dir = MemoryIdentityDirectory::new();
        dir.insert(UserProfile {
            user_id: "alice".into(),
            display_name: "Alice".into(),
            points: 120,
            avatar_url: Some("https://cdn.example/alice.png".into()),
        })
        .await;

        let profile = dir.profile("alice").await.unwrap();
        assert_eq!(profile.display_name, "Alice");

        let err = dir.profile("nobody").await.unwrap_err();
        assert!(matches!(err, DirectoryError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn room_lookup_and_miss() {
        let dir = MemoryRoomDirectory::new();
        dir.insert(room("a3f9", vec!["alice".into()])).await;

        let found = dir.room("a3f9").await.unwrap();
        assert_eq!(found.title, "morning crew");

        let err = dir.room("gone").await.unwrap_err();
        assert!(matches!(err, DirectoryError::RoomNotFound(_)));
    }

    #[tokio::test]
    async fn add_participant_appends_in_order_and_is_idempotent() {
        let dir = MemoryRoomDirectory::new();
        dir.insert(room("a3f9", vec!["alice".into()])).await;

        dir.add_participant("a3f9", "bob").await.unwrap();
        dir.add_participant("a3f9", "bob").await.unwrap();
        dir.add_participant("a3f9", "carol").await.unwrap();

        let found = dir.room("a3f9").await.unwrap();
        assert_eq!(found.participants, vec!["alice", "bob", "carol"]);

        let err = dir.add_participant("gone", "bob").await.unwrap_err();
        assert!(matches!(err, DirectoryError::RoomNotFound(_)));
    }

    #[tokio::test]
    async fn attendance_upsert_is_last_writer_wins() {
        let log = MemoryAttendanceLog::new();

        log.upsert(&verdict("alice", false, "first")).await.unwrap();
        log.upsert(&verdict("alice", true, "second")).await.unwrap();

        // Same (user, date) key: one row survives, the later write.
        assert_eq!(log.len().await, 1);
        assert_eq!(log.write_count(), 2);
        let row = log.get("alice", date()).await.unwrap();
        assert!(row.success);
        assert_eq!(row.reason, "second");
    }

    #[tokio::test]
    async fn attendance_rows_are_keyed_per_user() {
        let log = MemoryAttendanceLog::new();

        log.upsert(&verdict("alice", true, "r")).await.unwrap();
        log.upsert(&verdict("bob", true, "r")).await.unwrap();

        assert_eq!(log.len().await, 2);
        assert!(log.get("alice", date()).await.is_some());
        assert!(log.get("bob", date()).await.is_some());
        assert!(log.get("carol", date()).await.is_none());
    }
}
