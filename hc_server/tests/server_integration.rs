//! Admission and session-layer integration tests against an in-process
//! router backed by the in-memory snapshot store.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

use hc_server::api::{AppState, create_router};
use hc_server::config::SessionConfig;
use holdem_chips::{MemorySnapshotStore, RegistryConfig, RoomRegistry};

fn test_state() -> AppState {
    let store = Arc::new(MemorySnapshotStore::new());
    AppState {
        registry: Arc::new(RoomRegistry::new(store, RegistryConfig::default())),
        session: SessionConfig {
            heartbeat_interval_secs: 3,
            liveness_timeout_secs: 15,
        },
    }
}

async fn post_json(state: &AppState, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = create_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get_json(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let response = create_router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn create_room_body(device: &str) -> Value {
    json!({
        "player_name": "Ana",
        "player_emoji": "🦊",
        "sb_amount": 10,
        "initial_chips": 1000,
        "rebuy_minimum": 0,
        "device_id": device,
    })
}

#[tokio::test]
async fn create_join_lookup_and_leave_round_trip() {
    let state = test_state();

    let (status, created) = post_json(&state, "/rooms", create_room_body("device-ana")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["player_id"], "device-ana");
    let room_id = created["room_id"].as_str().unwrap().to_string();

    // Listed as a joinable room with the owner's profile.
    let (status, rooms) = get_json(&state, "/rooms").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rooms[0]["id"], room_id.as_str());
    assert_eq!(rooms[0]["owner_name"], "Ana");
    assert_eq!(rooms[0]["bb_amount"], 20);
    assert_eq!(rooms[0]["status"], "waiting");

    // Join with a second device.
    let (status, joined) = post_json(
        &state,
        "/rooms/join",
        json!({
            "room_id": room_id,
            "player_name": "Ben",
            "player_emoji": "🐻",
            "device_id": "device-ben",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["player_id"], "device-ben");

    // Joining again resolves to the same player record.
    let (status, rejoined) = post_json(
        &state,
        "/rooms/join",
        json!({
            "room_id": room_id,
            "player_name": "Someone Else",
            "player_emoji": "🦉",
            "device_id": "device-ben",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejoined["player_id"], "device-ben");

    // Device lookup finds the active room.
    let (_, found) = get_json(&state, "/player-room/device-ben").await;
    assert_eq!(found["room_id"], room_id.as_str());

    // Leave, then the lookup comes back empty.
    let (status, left) =
        post_json(&state, &format!("/rooms/{room_id}/leave/device-ben"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(left["ok"], true);
    let (_, found) = get_json(&state, "/player-room/device-ben").await;
    assert_eq!(found["room_id"], Value::Null);

    // Leaving an unknown room is fine.
    let (status, left) = post_json(&state, "/rooms/NOROOM/leave/device-ben", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(left["ok"], true);
}

#[tokio::test]
async fn create_room_validates_config() {
    let state = test_state();
    let (status, body) = post_json(
        &state,
        "/rooms",
        json!({
            "player_name": "Ana",
            "player_emoji": "🦊",
            "sb_amount": 0,
            "initial_chips": 1000,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("small blind"));

    let (status, _) = post_json(
        &state,
        "/rooms",
        json!({
            "player_name": "Ana",
            "player_emoji": "🦊",
            "sb_amount": 10,
            "initial_chips": 1000,
            "max_chips": 500,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &state,
        "/rooms/join",
        json!({
            "room_id": "MISSIN",
            "player_name": "Ben",
            "player_emoji": "🐻",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn random_profile_and_health() {
    let state = test_state();
    let (status, profile) = get_json(&state, "/random-profile").await;
    assert_eq!(status, StatusCode::OK);
    assert!(profile["name"].as_str().unwrap().contains('_'));
    assert!(!profile["emoji"].as_str().unwrap().is_empty());

    let response = create_router(state)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

async fn serve(state: AppState) -> std::net::SocketAddr {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

type WsClient = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn next_frame(ws: &mut WsClient) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Wait for a frame matching the predicate, skipping interleaved ones.
async fn frame_where(ws: &mut WsClient, predicate: impl Fn(&Value) -> bool) -> Value {
    for _ in 0..32 {
        let frame = next_frame(ws).await;
        if predicate(&frame) {
            return frame;
        }
    }
    panic!("expected frame never arrived");
}

#[tokio::test]
async fn session_delivers_snapshots_pongs_and_events() {
    let state = test_state();
    let (_, created) = post_json(&state, "/rooms", create_room_body("ana")).await;
    let room_id = created["room_id"].as_str().unwrap().to_string();
    post_json(
        &state,
        "/rooms/join",
        json!({
            "room_id": room_id,
            "player_name": "Ben",
            "player_emoji": "🐻",
            "device_id": "ben",
        }),
    )
    .await;

    let addr = serve(state).await;
    let (mut ana, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/{room_id}/ana"))
        .await
        .unwrap();

    // First frame is the authoritative snapshot.
    let frame = next_frame(&mut ana).await;
    assert_eq!(frame["type"], "room_state");
    assert_eq!(frame["room"]["id"], room_id.as_str());
    assert_eq!(frame["room"]["players"]["ana"]["seat"], 0);

    // Heartbeat echoes the timestamp verbatim.
    ana.send(Message::text(
        json!({"type": "ping", "timestamp": 777001}).to_string(),
    ))
    .await
    .unwrap();
    let pong = frame_where(&mut ana, |f| f["type"] == "pong").await;
    assert_eq!(pong["timestamp"], 777001);

    // Unknown tags produce an error frame for this client only.
    ana.send(Message::text(json!({"type": "shuffle_up"}).to_string()))
        .await
        .unwrap();
    let error = frame_where(&mut ana, |f| f["type"] == "error").await;
    assert!(error["message"].as_str().unwrap().contains("invalid frame"));

    // Ben connects, sits, and both ready up: a hand starts and every
    // subscriber hears about it.
    let (mut ben, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/{room_id}/ben"))
        .await
        .unwrap();
    next_frame(&mut ben).await; // initial snapshot

    ben.send(Message::text(json!({"type": "sit", "seat": 1}).to_string()))
        .await
        .unwrap();
    frame_where(&mut ana, |f| f["type"] == "event" && f["event"] == "sit").await;

    ben.send(Message::text(json!({"type": "ready"}).to_string()))
        .await
        .unwrap();
    ana.send(Message::text(json!({"type": "ready"}).to_string()))
        .await
        .unwrap();

    let started = frame_where(&mut ben, |f| {
        f["type"] == "event" && f["event"] == "hand_started"
    })
    .await;
    assert_eq!(started["dealer_seat"], 0);

    let playing = frame_where(&mut ana, |f| {
        f["type"] == "room_state" && f["room"]["status"] == "playing"
    })
    .await;
    assert_eq!(playing["room"]["hand"]["phase"], "preflop");
    assert_eq!(playing["room"]["hand"]["pot"], 30);

    // An out-of-turn action errors back to the offender only.
    ben.send(Message::text(
        json!({"type": "action", "action": "call", "amount": 0}).to_string(),
    ))
    .await
    .unwrap();
    let error = frame_where(&mut ben, |f| f["type"] == "error").await;
    assert_eq!(error["message"], "not your turn");
}

#[tokio::test]
async fn invalid_room_or_player_closes_with_4001() {
    let state = test_state();
    let (_, created) = post_json(&state, "/rooms", create_room_body("ana")).await;
    let room_id = created["room_id"].as_str().unwrap().to_string();
    let addr = serve(state).await;

    // Unknown room.
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/XXXXXX/ana"))
        .await
        .unwrap();
    let closed = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match closed {
        Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 4001),
        other => panic!("expected close frame, got {other:?}"),
    }

    // Known room, unknown player.
    let (mut ws, _) =
        tokio_tungstenite::connect_async(format!("ws://{addr}/ws/{room_id}/stranger"))
            .await
            .unwrap();
    let closed = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match closed {
        Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 4001),
        other => panic!("expected close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn disconnect_flips_the_connection_flag_but_keeps_the_seat() {
    let state = test_state();
    let (_, created) = post_json(&state, "/rooms", create_room_body("ana")).await;
    let room_id = created["room_id"].as_str().unwrap().to_string();
    let registry = state.registry.clone();
    let addr = serve(state).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/{room_id}/ana"))
        .await
        .unwrap();
    next_frame(&mut ws).await;

    // The session marked the player connected.
    let handle = registry.lookup(&room_id).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.players["ana"].is_connected);

    ws.close(None).await.unwrap();
    // Give the server a moment to run its cleanup path.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snapshot = handle.snapshot().await.unwrap();
    assert!(!snapshot.players["ana"].is_connected);
    assert_eq!(snapshot.players["ana"].seat, 0);
    assert!(snapshot.last_all_disconnected_at.is_some());
}
