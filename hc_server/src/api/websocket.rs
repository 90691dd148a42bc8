//! WebSocket session layer.
//!
//! Each client holds exactly one session bound to `(room_id, player_id)`.
//! The session subscribes to the room actor, forwards valid inbound frames
//! as commands, and relays outbound updates:
//!
//! - `room_state` frames are authoritative full snapshots. The actor pushes
//!   a marker per transition and the session fetches the *latest* snapshot
//!   on receipt, so a slow link coalesces intermediate states but always
//!   ends on the newest one.
//! - `event` frames are advisory and delivered exactly as emitted.
//! - `error` frames go only to the client whose command failed.
//!
//! A connection for an unknown room or player is closed with code 4001,
//! telling the client to go back through admission. Going silent past the
//! liveness timeout marks the player disconnected (their seat and their
//! turn survive; reconnecting with the same id reattaches).

use axum::{
    extract::{
        Path, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use holdem_chips::room::actor::subscriber_channel;
use holdem_chips::{
    Chips, GameError, GameEvent, PlayerAction, Room, RoomCommand, RoomHandle, RoomUpdate,
};

use super::{AppState, rate_limiter::RateLimiter};
use crate::metrics;

/// Close code that tells the client not to reconnect: the room is gone or
/// the player id is not a member.
const CLOSE_INVALID: u16 = 4001;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    /// Heartbeat; the timestamp is echoed back verbatim.
    Ping {
        #[serde(default)]
        timestamp: i64,
    },
    Sit {
        seat: usize,
    },
    Stand,
    /// Set readiness. Omitting the flag means "ready up", so bare `ready`
    /// frames are idempotent.
    Ready {
        #[serde(default = "ready_default")]
        ready: bool,
    },
    Action {
        action: PlayerAction,
        #[serde(default)]
        amount: Chips,
    },
    ProposeSettle {
        pot_winners: BTreeMap<String, Vec<String>>,
    },
    ConfirmSettle,
    RejectSettle,
    Rebuy,
    Cashout,
    EndGame,
}

fn ready_default() -> bool {
    true
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame<'a> {
    Pong {
        timestamp: i64,
    },
    RoomState {
        room: &'a Room,
    },
    Event {
        #[serde(flatten)]
        event: &'a GameEvent,
    },
    Error {
        message: &'a str,
    },
}

fn frame_json(frame: &ServerFrame<'_>) -> Option<String> {
    match serde_json::to_string(frame) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("failed to serialize server frame: {e}");
            None
        }
    }
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path((room_id, player_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, room_id, player_id, state))
}

async fn handle_socket(socket: WebSocket, room_id: String, player_id: String, state: AppState) {
    let Some(handle) = state.registry.lookup(&room_id).await else {
        close_invalid(socket).await;
        return;
    };
    let member = match handle.snapshot().await {
        Ok(snapshot) => snapshot.players.contains_key(&player_id),
        Err(_) => false,
    };
    if !member {
        close_invalid(socket).await;
        return;
    }

    metrics::websocket_connections_total();
    tracing::info!("websocket connected: room={room_id} player={player_id}");

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before flipping the connection flag so the resulting
    // broadcast reaches this session too.
    let (update_tx, mut update_rx) = subscriber_channel();
    let (sub_tx, sub_rx) = tokio::sync::oneshot::channel();
    let subscribed = handle
        .send(RoomCommand::Subscribe {
            player_id: player_id.clone(),
            sender: update_tx,
            respond: sub_tx,
        })
        .await
        .is_ok();
    let initial = match (subscribed, sub_rx.await) {
        (true, Ok(room)) => room,
        _ => {
            tracing::warn!("room {room_id}: subscription failed, closing session");
            return;
        }
    };
    let _ = handle
        .send(RoomCommand::SetConnected {
            player_id: player_id.clone(),
            connected: true,
        })
        .await;

    // Direct replies (pong, errors) bypass the broadcast path.
    let (response_tx, mut response_rx) = tokio::sync::mpsc::channel::<String>(32);
    if let Some(json) = frame_json(&ServerFrame::RoomState { room: &initial }) {
        let _ = response_tx.send(json).await;
    }

    // Outbound pump: broadcast updates and direct replies share the socket.
    let send_handle = handle.clone();
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                update = update_rx.recv() => match update {
                    Some(RoomUpdate::State) => {
                        let Ok(room) = send_handle.snapshot().await else { break };
                        let Some(json) = frame_json(&ServerFrame::RoomState { room: &room }) else {
                            continue;
                        };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                        metrics::websocket_frames_sent();
                    }
                    Some(RoomUpdate::Event(event)) => {
                        let Some(json) = frame_json(&ServerFrame::Event { event: &event }) else {
                            continue;
                        };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                        metrics::websocket_frames_sent();
                    }
                    None => break,
                },
                reply = response_rx.recv() => match reply {
                    Some(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                        metrics::websocket_frames_sent();
                    }
                    None => break,
                },
            }
        }
    });

    let mut burst_limiter = RateLimiter::burst();
    let mut sustained_limiter = RateLimiter::sustained();
    let liveness = Duration::from_secs(state.session.liveness_timeout_secs);

    loop {
        let message = match tokio::time::timeout(liveness, receiver.next()).await {
            Err(_) => {
                metrics::websocket_liveness_timeouts_total();
                tracing::info!(
                    "websocket liveness timeout: room={room_id} player={player_id}"
                );
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                tracing::warn!("websocket error: room={room_id} player={player_id}: {e}");
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                metrics::websocket_frames_received();
                if !burst_limiter.check() || !sustained_limiter.check() {
                    metrics::rate_limit_hits_total("websocket");
                    tracing::warn!(
                        "rate limit exceeded: room={room_id} player={player_id}"
                    );
                    send_error(&response_tx, "rate limit exceeded, slow down").await;
                    continue;
                }
                match serde_json::from_str::<ClientFrame>(&text) {
                    Err(e) => {
                        send_error(&response_tx, &format!("invalid frame: {e}")).await;
                    }
                    Ok(ClientFrame::Ping { timestamp }) => {
                        if let Some(json) = frame_json(&ServerFrame::Pong { timestamp }) {
                            let _ = response_tx.send(json).await;
                        }
                    }
                    Ok(frame) => {
                        if let Err(e) = dispatch(&handle, &player_id, frame).await {
                            send_error(&response_tx, &e.to_string()).await;
                        }
                    }
                }
            }
            Message::Close(_) => break,
            // Protocol-level ping/pong and binary frames are ignored.
            _ => {}
        }
    }

    send_task.abort();
    let _ = handle
        .send(RoomCommand::Unsubscribe {
            player_id: player_id.clone(),
        })
        .await;
    let _ = handle
        .send(RoomCommand::SetConnected {
            player_id: player_id.clone(),
            connected: false,
        })
        .await;
    tracing::info!("websocket disconnected: room={room_id} player={player_id}");
}

/// Forward a parsed frame to the room actor and wait for the engine's
/// verdict. The success path needs no reply here: the actor broadcasts the
/// new snapshot to every subscriber, this session included.
async fn dispatch(
    handle: &RoomHandle,
    player_id: &str,
    frame: ClientFrame,
) -> Result<(), GameError> {
    let player_id = player_id.to_string();
    match frame {
        ClientFrame::Ping { .. } => Ok(()),
        ClientFrame::Sit { seat } => {
            handle
                .request(|respond| RoomCommand::Sit {
                    player_id,
                    seat,
                    respond,
                })
                .await
        }
        ClientFrame::Stand => {
            handle
                .request(|respond| RoomCommand::Stand { player_id, respond })
                .await
        }
        ClientFrame::Ready { ready } => {
            handle
                .request(|respond| RoomCommand::Ready {
                    player_id,
                    ready,
                    respond,
                })
                .await
        }
        ClientFrame::Action { action, amount } => {
            handle
                .request(|respond| RoomCommand::Action {
                    player_id,
                    action,
                    amount,
                    respond,
                })
                .await
        }
        ClientFrame::ProposeSettle { pot_winners } => {
            handle
                .request(|respond| RoomCommand::ProposeSettle {
                    player_id,
                    pot_winners,
                    respond,
                })
                .await
        }
        ClientFrame::ConfirmSettle => {
            handle
                .request(|respond| RoomCommand::ConfirmSettle { player_id, respond })
                .await
        }
        ClientFrame::RejectSettle => {
            handle
                .request(|respond| RoomCommand::RejectSettle { player_id, respond })
                .await
        }
        ClientFrame::Rebuy => {
            handle
                .request(|respond| RoomCommand::Rebuy { player_id, respond })
                .await
        }
        ClientFrame::Cashout => {
            handle
                .request(|respond| RoomCommand::Cashout { player_id, respond })
                .await
        }
        ClientFrame::EndGame => {
            handle
                .request(|respond| RoomCommand::EndGame { player_id, respond })
                .await
        }
    }
}

async fn send_error(response_tx: &tokio::sync::mpsc::Sender<String>, message: &str) {
    if let Some(json) = frame_json(&ServerFrame::Error { message }) {
        let _ = response_tx.send(json).await;
    }
}

async fn close_invalid(mut socket: WebSocket) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: CLOSE_INVALID,
            reason: "room or player invalid".into(),
        })))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_parse_from_wire_json() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"action","action":"raise","amount":120}"#).unwrap();
        assert!(matches!(
            frame,
            ClientFrame::Action {
                action: PlayerAction::Raise,
                amount: 120
            }
        ));

        let frame: ClientFrame = serde_json::from_str(r#"{"type":"ready"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::Ready { ready: true }));

        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"propose_settle","pot_winners":{"pot-0":["abc"]}}"#)
                .unwrap();
        let ClientFrame::ProposeSettle { pot_winners } = frame else {
            panic!("expected propose_settle");
        };
        assert_eq!(pot_winners["pot-0"], vec!["abc"]);
    }

    #[test]
    fn unknown_frame_tags_are_rejected() {
        let result = serde_json::from_str::<ClientFrame>(r#"{"type":"deal_cards"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn event_frames_flatten_into_the_envelope() {
        let event = GameEvent::PhaseChange {
            phase: holdem_chips::HandPhase::Flop,
        };
        let json = frame_json(&ServerFrame::Event { event: &event }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "event");
        assert_eq!(value["event"], "phase_change");
        assert_eq!(value["phase"], "flop");
    }

    #[test]
    fn pong_echoes_the_timestamp() {
        let json = frame_json(&ServerFrame::Pong { timestamp: 172534 }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "pong");
        assert_eq!(value["timestamp"], 172534);
    }
}
