//! Admission API handlers.
//!
//! Creates and joins rooms, resolves which room a device is in, and handles
//! intentional leaves. Identity is the device id: supplying the same
//! `device_id` always resolves to the same player record, which is what
//! makes reloads and reconnections transparent.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rand::{Rng, seq::SliceRandom, thread_rng};
use serde::{Deserialize, Serialize};

use holdem_chips::game::constants::DEFAULT_HAND_INTERVAL_SECS;
use holdem_chips::{Chips, GameError, RoomCommand, RoomConfig, RoomStatus};

use super::AppState;
use crate::metrics;

const NAMES: &[&str] = &[
    "Player", "Ace", "King", "Queen", "Jack", "Joker", "Shark", "Fish", "Whale", "Tiger", "Eagle",
    "Fox", "Wolf", "Bear", "Hawk", "Lion",
];

const EMOJIS: &[&str] = &[
    "😀", "😎", "🤠", "🦊", "🐱", "🐶", "🐼", "🦁", "🐯", "🐸", "🐵", "🦄", "🐲", "🦅", "🐧",
    "🐨", "🐰", "🐷", "🦋", "🌟", "🔥", "💎", "🎯", "🎲", "👑", "🃏", "♠️", "♥️", "♦️", "♣️",
];

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub player_name: String,
    pub player_emoji: String,
    pub sb_amount: Chips,
    pub initial_chips: Chips,
    #[serde(default)]
    pub rebuy_minimum: Chips,
    #[serde(default = "default_hand_interval")]
    pub hand_interval: u64,
    #[serde(default)]
    pub max_chips: Chips,
    #[serde(default)]
    pub device_id: Option<String>,
}

fn default_hand_interval() -> u64 {
    DEFAULT_HAND_INTERVAL_SECS
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub room_id: String,
    pub player_name: String,
    pub player_emoji: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdmissionResponse {
    pub room_id: String,
    pub player_id: String,
}

#[derive(Debug, Serialize)]
pub struct RoomListItem {
    pub id: String,
    pub owner_name: String,
    pub owner_emoji: String,
    pub sb_amount: Chips,
    pub bb_amount: Chips,
    pub initial_chips: Chips,
    pub player_count: usize,
    pub status: RoomStatus,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn game_error(e: GameError) -> ApiError {
    let status = match e {
        GameError::NotFound => StatusCode::NOT_FOUND,
        GameError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    api_error(status, e.to_string())
}

fn generate_player_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

fn generate_room_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(6);
    id.to_uppercase()
}

fn resolve_player_id(device_id: Option<String>) -> String {
    device_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_player_id)
}

/// Pull a device out of whatever room it currently occupies. Best effort:
/// a room mid-hand refuses the leave and is left alone.
async fn leave_other_rooms(state: &AppState, player_id: &str, keep_room: Option<&str>) {
    for room in state.registry.list().await {
        if Some(room.id.as_str()) == keep_room || !room.players.contains_key(player_id) {
            continue;
        }
        let Some(handle) = state.registry.lookup(&room.id).await else {
            continue;
        };
        let player_id = player_id.to_string();
        if let Err(e) = handle
            .request(|respond| RoomCommand::Leave { player_id, respond })
            .await
        {
            tracing::debug!("could not remove player from room {}: {}", room.id, e);
        }
    }
}

/// `POST /rooms` — create a room with the caller as its seated owner.
pub async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Json<AdmissionResponse>, ApiError> {
    let config = RoomConfig {
        sb_amount: req.sb_amount,
        initial_chips: req.initial_chips,
        rebuy_minimum: req.rebuy_minimum,
        max_chips: req.max_chips,
        hand_interval: req.hand_interval,
    };
    config.validate().map_err(game_error)?;
    if req.player_name.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "player name must not be empty",
        ));
    }

    let player_id = resolve_player_id(req.device_id);
    leave_other_rooms(&state, &player_id, None).await;

    let room_id = generate_room_id();
    let now = chrono::Utc::now().timestamp();
    let room = config.new_room(
        room_id.clone(),
        player_id.clone(),
        req.player_name.trim(),
        &req.player_emoji,
        now,
    );
    state.registry.open(room).await.map_err(game_error)?;
    metrics::rooms_created_total();
    tracing::info!("room {} created by {}", room_id, player_id);

    Ok(Json(AdmissionResponse { room_id, player_id }))
}

/// `GET /rooms` — joinable (waiting) rooms with their owner and how many
/// players are online.
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomListItem>> {
    let mut items = Vec::new();
    for room in state.registry.list().await {
        if room.status != RoomStatus::Waiting {
            continue;
        }
        let owner = room.players.get(&room.owner_id);
        items.push(RoomListItem {
            id: room.id.clone(),
            owner_name: owner.map_or_else(|| "Unknown".to_string(), |p| p.name.clone()),
            owner_emoji: owner.map_or_else(|| "❓".to_string(), |p| p.emoji.clone()),
            sb_amount: room.sb_amount,
            bb_amount: room.bb_amount,
            initial_chips: room.initial_chips,
            player_count: room.connected_count(),
            status: room.status,
        });
    }
    Json(items)
}

/// `POST /rooms/join` — join a room, or transparently resolve back into it
/// when the device is already a member.
pub async fn join_room(
    State(state): State<AppState>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<AdmissionResponse>, ApiError> {
    let handle = state
        .registry
        .lookup(&req.room_id)
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "room not found"))?;

    let player_id = resolve_player_id(req.device_id);
    let snapshot = handle.snapshot().await.map_err(game_error)?;
    if snapshot.players.contains_key(&player_id) {
        // Reconnection: the record already exists, nothing to change.
        return Ok(Json(AdmissionResponse {
            room_id: snapshot.id.clone(),
            player_id,
        }));
    }

    leave_other_rooms(&state, &player_id, Some(&req.room_id)).await;

    if req.player_name.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "player name must not be empty",
        ));
    }
    let join_id = player_id.clone();
    let name = req.player_name.trim().to_string();
    let emoji = req.player_emoji.clone();
    handle
        .request(move |respond| RoomCommand::Join {
            player_id: join_id,
            name,
            emoji,
            respond,
        })
        .await
        .map_err(game_error)?;
    metrics::room_joins_total();

    Ok(Json(AdmissionResponse {
        room_id: req.room_id,
        player_id,
    }))
}

#[derive(Debug, Serialize)]
pub struct PlayerRoomResponse {
    pub room_id: Option<String>,
}

/// `GET /player-room/{player_id}` — which room a device should auto-rejoin.
pub async fn player_room(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Json<PlayerRoomResponse> {
    Json(PlayerRoomResponse {
        room_id: state.registry.room_of_player(&player_id).await,
    })
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// `POST /rooms/{room_id}/leave/{player_id}` — intentional leave. Refused
/// mid-hand; leaving a room that no longer exists is fine.
pub async fn leave_room(
    State(state): State<AppState>,
    Path((room_id, player_id)): Path<(String, String)>,
) -> Result<Json<OkResponse>, ApiError> {
    let Some(handle) = state.registry.lookup(&room_id).await else {
        return Ok(Json(OkResponse { ok: true }));
    };
    handle
        .request(move |respond| RoomCommand::Leave { player_id, respond })
        .await
        .map_err(game_error)?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Debug, Serialize)]
pub struct RandomProfile {
    pub name: String,
    pub emoji: String,
}

/// `GET /random-profile` — a name/emoji suggestion for first-time players.
pub async fn random_profile() -> Json<RandomProfile> {
    let mut rng = thread_rng();
    let name = format!(
        "{}_{}",
        NAMES.choose(&mut rng).copied().unwrap_or("Player"),
        rng.gen_range(10..100)
    );
    let emoji = EMOJIS.choose(&mut rng).copied().unwrap_or("🃏").to_string();
    Json(RandomProfile { name, emoji })
}
