//! HTTP/WebSocket API for the chip coordinator.
//!
//! Two surfaces share one router:
//!
//! - [`rooms`]: admission — create/join/list/leave rooms, device lookup, and
//!   the random-profile utility. Plain request/response JSON.
//! - [`websocket`]: the session channel at `/ws/{room_id}/{player_id}` —
//!   full room snapshots and advisory events out, player commands in.
//!
//! Admission hands out stable player ids keyed by device identity; the same
//! id re-opens the same player record after a reload, so there is no account
//! system and no authentication layer. CORS is permissive: room ids are
//! capability-style invitations, not secrets worth a same-origin policy.

pub mod rate_limiter;
pub mod rooms;
pub mod websocket;

use axum::{
    Router,
    routing::{get, post},
};
use holdem_chips::RoomRegistry;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::SessionConfig;

/// Application state shared across handlers. Cloned per request; cheap via
/// the Arc.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub session: SessionConfig,
}

/// Build the complete router.
///
/// ```text
/// GET  /health                           - health check
/// POST /rooms                            - create a room
/// GET  /rooms                            - list joinable rooms
/// POST /rooms/join                       - join (or rejoin) a room
/// GET  /player-room/{player_id}          - active room for a device
/// POST /rooms/{room_id}/leave/{player_id} - leave a room
/// GET  /random-profile                   - name/emoji suggestion
/// GET  /ws/{room_id}/{player_id}         - session channel
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/rooms", post(rooms::create_room).get(rooms::list_rooms))
        .route("/rooms/join", post(rooms::join_room))
        .route("/player-room/{player_id}", get(rooms::player_room))
        .route(
            "/rooms/{room_id}/leave/{player_id}",
            post(rooms::leave_room),
        )
        .route("/random-profile", get(rooms::random_profile))
        .route("/ws/{room_id}/{player_id}", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
