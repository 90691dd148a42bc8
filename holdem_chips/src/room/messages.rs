//! Room actor message types.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::game::entities::{Chips, PlayerAction, PlayerId, Room};
use crate::game::errors::GameError;
use crate::game::events::GameEvent;

/// Reply channel for commands that either succeed (and get broadcast) or
/// fail back to the originator only.
pub type Ack = oneshot::Sender<Result<(), GameError>>;

/// Commands accepted by a room actor. Ordering within a room is exactly
/// inbox arrival order; each command runs to completion before the next.
#[derive(Debug)]
pub enum RoomCommand {
    /// Admission: add a player (idempotent per id).
    Join {
        player_id: PlayerId,
        name: String,
        emoji: String,
        respond: Ack,
    },

    /// Admission: remove a player. Refused mid-hand.
    Leave { player_id: PlayerId, respond: Ack },

    Sit {
        player_id: PlayerId,
        seat: usize,
        respond: Ack,
    },

    Stand { player_id: PlayerId, respond: Ack },

    Ready {
        player_id: PlayerId,
        ready: bool,
        respond: Ack,
    },

    /// A betting action; `amount` is the raise-to total and ignored for the
    /// other actions.
    Action {
        player_id: PlayerId,
        action: PlayerAction,
        amount: Chips,
        respond: Ack,
    },

    ProposeSettle {
        player_id: PlayerId,
        pot_winners: BTreeMap<String, Vec<PlayerId>>,
        respond: Ack,
    },

    ConfirmSettle { player_id: PlayerId, respond: Ack },

    RejectSettle { player_id: PlayerId, respond: Ack },

    Rebuy { player_id: PlayerId, respond: Ack },

    Cashout { player_id: PlayerId, respond: Ack },

    EndGame { player_id: PlayerId, respond: Ack },

    /// Register a session for updates; replies with the current snapshot.
    Subscribe {
        player_id: PlayerId,
        sender: mpsc::Sender<RoomUpdate>,
        respond: oneshot::Sender<Arc<Room>>,
    },

    Unsubscribe { player_id: PlayerId },

    /// Session liveness transition. No reply; failures are logged only.
    SetConnected { player_id: PlayerId, connected: bool },

    /// Read the current snapshot.
    Snapshot { respond: oneshot::Sender<Arc<Room>> },

    /// Stop the actor loop after replying.
    Shutdown { respond: oneshot::Sender<()> },
}

/// Pushed to subscribers after each successful transition.
///
/// `State` is a marker, not a payload: the session fetches the latest
/// snapshot when it sees one, which coalesces intermediate snapshots on a
/// slow link while guaranteeing the final state is delivered. Events carry
/// their payload and are never coalesced.
#[derive(Clone, Debug)]
pub enum RoomUpdate {
    State,
    Event(GameEvent),
}
