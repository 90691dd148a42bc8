//! Advisory events emitted by engine transitions.
//!
//! Snapshots are authoritative; events exist so clients can narrate what
//! happened between two snapshots (toasts, sounds, the settlement banner).
//! The `event` tag and field names are part of the wire contract.

use serde::{Deserialize, Serialize};

use super::entities::{Chips, HandPhase, PlayerAction, PlayerId};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    Sit {
        player_id: PlayerId,
        seat: usize,
    },
    Stand {
        player_id: PlayerId,
    },
    ReadyToggle {
        player_id: PlayerId,
        ready: bool,
    },
    HandStarted {
        dealer_seat: i32,
    },
    Action {
        player_id: PlayerId,
        player_name: String,
        action: PlayerAction,
        detail: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<Chips>,
    },
    PhaseChange {
        phase: HandPhase,
    },
    SingleWinner {
        winner: PlayerId,
        winner_name: String,
        pot: Chips,
    },
    SettlementProposed {
        proposer_id: PlayerId,
        proposer_name: String,
    },
    SettlementConfirmed {
        player_id: PlayerId,
        confirmed: usize,
        required: usize,
    },
    SettlementRejected {
        player_id: PlayerId,
        rejector_name: String,
    },
    Settled {
        settlements: Vec<Settlement>,
    },
    Rebuy {
        player_id: PlayerId,
        chips: Chips,
    },
    Cashout {
        player_id: PlayerId,
        chips: Chips,
    },
    GameEnded {
        standings: Vec<Standing>,
    },
}

/// One pot share paid out by a ratified settlement.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Settlement {
    pub pot_id: String,
    pub player_id: PlayerId,
    pub player_name: String,
    pub amount: Chips,
}

/// End-of-game line for one player. `net` accounts for the buy-in plus every
/// rebuy and cashout, so standings sum to zero across the table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Standing {
    pub player_id: PlayerId,
    pub name: String,
    pub chips: Chips,
    pub total_rebuys: u32,
    pub total_cashouts: u32,
    pub net: Chips,
}
