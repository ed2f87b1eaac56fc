//! HTTP and WebSocket surface for the room session core.
//!
//! Chat rides a WebSocket per connection; voice presence, the wake-up
//! trigger, and the minimal provisioning the in-memory directories need are
//! plain request/response routes. The attendance pipeline itself never
//! surfaces here: it is a background effect of a voice join.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use wakeroom_common::errors::DirectoryError;
use wakeroom_common::new_id;
use wakeroom_core::{ChatSession, IdentityDirectory, Room, RoomDirectory, UserProfile};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/:room_id/participants", post(add_participant))
        .route("/rooms/:room_id/chat", get(chat_ws))
        .route("/rooms/:room_id/voice/join", post(voice_join))
        .route("/rooms/:room_id/voice/leave", post(voice_leave))
        .route("/rooms/:room_id/voice/members", get(voice_members))
        .route("/rooms/:room_id/wake-up", post(wake_up))
        .route("/users/:user_id", put(upsert_profile))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Resolve the room and check the principal is on its participant list.
async fn require_participant(
    state: &AppState,
    room_id: &str,
    user_id: &str,
) -> Result<Room, Response> {
    match state.rooms.room(room_id).await {
        Ok(room) => {
            if room.participants.iter().any(|p| p == user_id) {
                Ok(room)
            } else {
                Err(error(StatusCode::FORBIDDEN, "not a room participant"))
            }
        }
        Err(DirectoryError::RoomNotFound(_)) => Err(error(StatusCode::NOT_FOUND, "room not found")),
        Err(e) => Err(error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CreateRoomRequest {
    title: String,
    /// Civil date, `YYYY-MM-DD`.
    wake_date: String,
    /// Civil time, `HH:MM`.
    wake_time: String,
    public: bool,
    creator: String,
}

fn parse_wake(date: &str, time: &str) -> Result<(NaiveDate, NaiveTime), String> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("bad wake_date: {e}"))?;
    let time =
        NaiveTime::parse_from_str(time, "%H:%M").map_err(|e| format!("bad wake_time: {e}"))?;
    Ok((date, time))
}

/// Short opaque room code.
fn new_room_code() -> String {
    new_id()[..8].to_string()
}

async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Response {
    let (wake_date, wake_time) = match parse_wake(&req.wake_date, &req.wake_time) {
        Ok(parsed) => parsed,
        Err(msg) => return error(StatusCode::BAD_REQUEST, &msg),
    };

    let room = Room {
        room_id: new_room_code(),
        title: req.title,
        wake_date,
        wake_time,
        public: req.public,
        // The creator is always the first participant.
        participants: vec![req.creator],
    };
    let room_id = room.room_id.clone();
    state.rooms.insert(room).await;

    (StatusCode::CREATED, Json(json!({ "room_id": room_id }))).into_response()
}

#[derive(Deserialize)]
struct ParticipantRequest {
    user_id: String,
}

async fn add_participant(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<ParticipantRequest>,
) -> Response {
    match state.rooms.add_participant(&room_id, &req.user_id).await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(DirectoryError::RoomNotFound(_)) => error(StatusCode::NOT_FOUND, "room not found"),
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ChatParams {
    user_id: String,
}

async fn chat_ws(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(params): Query<ChatParams>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Err(resp) = require_participant(&state, &room_id, &params.user_id).await {
        return resp;
    }
    ws.on_upgrade(move |socket| chat_connection(socket, state, room_id, params.user_id))
}

/// Pump one chat connection until it disconnects or violates the protocol.
async fn chat_connection(socket: WebSocket, state: AppState, room_id: String, user_id: String) {
    let (mut sink, mut stream) = socket.split();

    let (session, mut rx) = ChatSession::open(
        state.registry.clone(),
        state.broadcaster.clone(),
        state.identities.as_ref(),
        &room_id,
        &user_id,
        state.chat_buffer,
    )
    .await;

    loop {
        tokio::select! {
            // Room traffic for this connection → its socket.
            Some(msg) = rx.recv() => {
                if sink.send(Message::Text(msg)).await.is_err() {
                    break;
                }
            }

            // Frames from this client → relay into the room.
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = session.handle_inbound(&text).await {
                            warn!(room_id = %room_id, user_id = %user_id, error = %e, "closing chat connection");
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(room_id = %room_id, error = %e, "ws error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    session.close().await;
}

// ---------------------------------------------------------------------------
// Voice presence
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct VoiceRequest {
    user_id: String,
}

async fn voice_join(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<VoiceRequest>,
) -> Response {
    if let Err(resp) = require_participant(&state, &room_id, &req.user_id).await {
        return resp;
    }
    state.attendance.voice_join(&room_id, &req.user_id).await;
    Json(json!({ "ok": true })).into_response()
}

async fn voice_leave(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<VoiceRequest>,
) -> Response {
    if let Err(e) = state.rooms.room(&room_id).await {
        return match e {
            DirectoryError::RoomNotFound(_) => error(StatusCode::NOT_FOUND, "room not found"),
            other => error(StatusCode::INTERNAL_SERVER_ERROR, &other.to_string()),
        };
    }
    state.attendance.voice_leave(&room_id, &req.user_id).await;
    Json(json!({ "ok": true })).into_response()
}

#[derive(Serialize)]
struct MemberSummary {
    user_id: String,
    display_name: String,
    points: i64,
    avatar_url: Option<String>,
}

async fn voice_members(State(state): State<AppState>, Path(room_id): Path<String>) -> Response {
    if let Err(e) = state.rooms.room(&room_id).await {
        return match e {
            DirectoryError::RoomNotFound(_) => error(StatusCode::NOT_FOUND, "room not found"),
            other => error(StatusCode::INTERNAL_SERVER_ERROR, &other.to_string()),
        };
    }

    let mut members = Vec::new();
    for user_id in state.attendance.current_members(&room_id).await {
        let summary = match state.identities.profile(&user_id).await {
            Ok(profile) => MemberSummary {
                user_id: profile.user_id,
                display_name: profile.display_name,
                points: profile.points,
                avatar_url: profile.avatar_url,
            },
            Err(e) => {
                debug!(user_id = %user_id, error = %e, "profile lookup failed, degrading");
                MemberSummary {
                    user_id: user_id.clone(),
                    display_name: user_id,
                    points: 0,
                    avatar_url: None,
                }
            }
        };
        members.push(summary);
    }
    Json(members).into_response()
}

// ---------------------------------------------------------------------------
// Wake-up trigger
// ---------------------------------------------------------------------------

async fn wake_up(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<VoiceRequest>,
) -> Response {
    let room = match require_participant(&state, &room_id, &req.user_id).await {
        Ok(room) => room,
        Err(resp) => return resp,
    };
    let delivered = state
        .broadcaster
        .wake_up(&room_id, format!("Wake up! {} is starting", room.title))
        .await;
    Json(json!({ "ok": true, "delivered": delivered })).into_response()
}

// ---------------------------------------------------------------------------
// Profile provisioning
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ProfileRequest {
    display_name: String,
    #[serde(default)]
    points: i64,
    #[serde(default)]
    avatar_url: Option<String>,
}

async fn upsert_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<ProfileRequest>,
) -> Response {
    state
        .identities
        .insert(UserProfile {
            user_id,
            display_name: req.display_name,
            points: req.points,
            avatar_url: req.avatar_url,
        })
        .await;
    Json(json!({ "ok": true })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_wake_accepts_civil_shapes() {
        let (date, time) = parse_wake("2025-07-01", "06:30").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(time, NaiveTime::from_hms_opt(6, 30, 0).unwrap());
    }

    #[test]
    fn parse_wake_rejects_bad_input() {
        assert!(parse_wake("07/01/2025", "06:30").is_err());
        assert!(parse_wake("2025-07-01", "6.30").is_err());
    }

    #[test]
    fn room_codes_are_short_and_unique() {
        let a = new_room_code();
        let b = new_room_code();
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }
}
