//! Voice-channel attendance: per-room presence and the one-shot evaluation
//! that turns presence at fire time into durable verdicts.
//!
//! A room's first voice join arms the evaluation, which fires once after a
//! configurable grace delay, compares the present set against the room's
//! expected participants, and upserts one verdict per expected participant.
//! The evaluated flag is permanent for the process lifetime; presence state
//! is in-memory only and lost on restart.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use wakeroom_common::clock;

use crate::directory::{AttendanceLog, RoomDirectory, Verdict};

/// Type tag on automatically written group-attendance verdicts.
pub const GROUP_VERDICT_KIND: &str = "group_wakeup";

/// Reason recorded on automatically written group-attendance verdicts.
pub const GROUP_VERDICT_REASON: &str = "group wake-up attendance check";

/// Tunables for the attendance pipeline.
#[derive(Debug, Clone)]
pub struct AttendanceConfig {
    /// How long after a room's first voice join the evaluation fires.
    /// Models the grace window after the scheduled wake time.
    pub grace_delay: Duration,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            grace_delay: Duration::from_secs(300),
        }
    }
}

/// Per-room presence state, created on the room's first voice join.
#[derive(Debug)]
struct AttendanceSession {
    present: HashSet<String>,
    armed_at: DateTime<FixedOffset>,
    evaluated: bool,
}

/// Presence snapshot exposed to status queries.
#[derive(Debug, Clone)]
pub struct AttendanceSnapshot {
    pub present: Vec<String>,
    pub armed_at: DateTime<FixedOffset>,
    pub evaluated: bool,
}

/// Tracks who is in each room's voice channel and evaluates the group
/// outcome once per room, a fixed delay after the first join.
#[derive(Clone)]
pub struct AttendanceManager {
    sessions: Arc<RwLock<HashMap<String, AttendanceSession>>>,
    rooms: Arc<dyn RoomDirectory>,
    log: Arc<dyn AttendanceLog>,
    config: AttendanceConfig,
}

impl AttendanceManager {
    pub fn new(
        rooms: Arc<dyn RoomDirectory>,
        log: Arc<dyn AttendanceLog>,
        config: AttendanceConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            rooms,
            log,
            config,
        }
    }

    /// Record a user's voice-channel join, idempotently.
    ///
    /// The join that creates the room's session wins the arming race under
    /// the write guard and is the only one that schedules the deferred
    /// evaluation; every later join only updates the present set.
    pub async fn voice_join(&self, room_id: &str, user_id: &str) {
        let armed = {
            let mut sessions = self.sessions.write().await;
            match sessions.entry(room_id.to_string()) {
                Entry::Occupied(mut e) => {
                    e.get_mut().present.insert(user_id.to_string());
                    false
                }
                Entry::Vacant(e) => {
                    let session = e.insert(AttendanceSession {
                        present: HashSet::new(),
                        armed_at: clock::now(),
                        evaluated: false,
                    });
                    session.present.insert(user_id.to_string());
                    true
                }
            }
        };
        debug!(room_id, user_id, "voice join");

        if armed {
            let delay = self.config.grace_delay;
            info!(room_id, delay_secs = delay.as_secs(), "attendance evaluation armed");
            let mgr = self.clone();
            let room = room_id.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                mgr.evaluate(&room).await;
            });
        }
    }

    /// Remove a user from the present set, idempotently. Leaving never
    /// cancels or re-arms the scheduled evaluation; the fire-time snapshot
    /// decides the outcome.
    pub async fn voice_leave(&self, room_id: &str, user_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(room_id) {
            session.present.remove(user_id);
        }
        debug!(room_id, user_id, "voice leave");
    }

    /// Users currently in the room's voice channel, sorted for stable
    /// output. Read-only: never touches evaluation state.
    pub async fn current_members(&self, room_id: &str) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut members: Vec<String> = sessions
            .get(room_id)
            .map(|s| s.present.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    /// Present set plus evaluation status, or `None` before the first join.
    pub async fn snapshot(&self, room_id: &str) -> Option<AttendanceSnapshot> {
        let sessions = self.sessions.read().await;
        sessions.get(room_id).map(|s| {
            let mut present: Vec<String> = s.present.iter().cloned().collect();
            present.sort();
            AttendanceSnapshot {
                present,
                armed_at: s.armed_at,
                evaluated: s.evaluated,
            }
        })
    }

    /// Run the room's evaluation.
    ///
    /// At most one invocation per room ever proceeds past the guard: the
    /// evaluated flag is checked and set in the same critical section that
    /// snapshots the present set, so duplicate timer fires and direct
    /// re-entry are no-ops and the snapshot cannot tear against concurrent
    /// joins or leaves.
    pub async fn evaluate(&self, room_id: &str) {
        let present = {
            let mut sessions = self.sessions.write().await;
            let Some(session) = sessions.get_mut(room_id) else {
                debug!(room_id, "no attendance session, nothing to evaluate");
                return;
            };
            if session.evaluated {
                debug!(room_id, "attendance already evaluated");
                return;
            }
            session.evaluated = true;
            session.present.clone()
        };

        let room = match self.rooms.room(room_id).await {
            Ok(room) => room,
            Err(e) => {
                warn!(room_id, error = %e, "room lookup failed, skipping evaluation");
                return;
            }
        };

        let expected: HashSet<&str> = room.participants.iter().map(String::as_str).collect();
        let actual: HashSet<&str> = present.iter().map(String::as_str).collect();
        // Exact equality: an absentee or an uninvited extra both fail the group.
        let all_present = expected == actual;
        info!(
            room_id,
            all_present,
            expected = expected.len(),
            present = actual.len(),
            "attendance evaluated"
        );

        let wake_time = clock::fmt_wake_time(room.wake_time);
        for user_id in &room.participants {
            let verdict = Verdict {
                user_id: user_id.clone(),
                date: room.wake_date,
                success: all_present,
                kind: GROUP_VERDICT_KIND.to_string(),
                wake_time: wake_time.clone(),
                reason: GROUP_VERDICT_REASON.to_string(),
                participants: room.participants.clone(),
            };
            if let Err(e) = self.log.upsert(&verdict).await {
                // Writes are independent per participant; a failure is
                // logged, never retried into a second evaluation.
                warn!(room_id, user_id, error = %e, "verdict write failed");
            }
        }
    }
}
