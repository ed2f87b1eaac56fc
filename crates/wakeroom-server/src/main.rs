//! wakeroom-server: HTTP/WebSocket host for the room session core.
//!
//! Serves room chat over WebSockets and the voice-presence operations over
//! plain routes, wired to in-memory directories. Swap the directories for
//! real stores to embed the core in a larger application.

mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use wakeroom_core::{
    AttendanceConfig, AttendanceManager, Broadcaster, MemoryAttendanceLog,
    MemoryIdentityDirectory, MemoryRoomDirectory, SessionRegistry,
};

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "wakeroom-server", about = "Group wake-up room server")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Seconds between a room's first voice join and its attendance
    /// evaluation.
    #[arg(long, default_value_t = 300)]
    grace_secs: u64,

    /// Per-connection outbound chat buffer (messages).
    #[arg(long, default_value_t = 256)]
    chat_buffer: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wakeroom=info".into()),
        )
        .init();

    let args = Args::parse();

    let identities = Arc::new(MemoryIdentityDirectory::new());
    let rooms = Arc::new(MemoryRoomDirectory::new());
    let attendance_log = Arc::new(MemoryAttendanceLog::new());

    let registry = SessionRegistry::new();
    let broadcaster = Broadcaster::new(registry.clone());
    let attendance = AttendanceManager::new(
        rooms.clone(),
        attendance_log.clone(),
        AttendanceConfig {
            grace_delay: Duration::from_secs(args.grace_secs),
        },
    );

    let app = routes::router(AppState {
        registry,
        broadcaster,
        attendance,
        identities,
        rooms,
        chat_buffer: args.chat_buffer,
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("failed to bind TCP listener");

    tracing::info!("wakeroom-server listening on {}", addr);

    axum::serve(listener, app).await.expect("server error");
}
