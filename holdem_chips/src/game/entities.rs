//! Room, player, and hand data model.
//!
//! Field names and enum spellings here are the wire contract: snapshots are
//! serialized as-is into `room_state` frames and into the snapshot store, so
//! renames break deployed clients. Collections that end up in snapshots use
//! ordered containers to keep serialization and replay deterministic.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::constants::SEATS;
use super::errors::GameError;

/// Whole chips. Stacks, bets, and pots are integers; shares are split with
/// floor division and a deterministic odd-chip rule.
pub type Chips = i64;

pub type PlayerId = String;
pub type RoomId = String;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandPhase {
    HandStart,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
    HandEnd,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Active,
    Folded,
    AllIn,
    SittingOut,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Fold,
    Check,
    Call,
    Raise,
    AllIn,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub emoji: String,
    pub chips: Chips,
    /// Seat index, or -1 while unseated.
    pub seat: i32,
    pub ready: bool,
    pub status: PlayerStatus,
    /// Chips in front of the player this street.
    pub current_bet: Chips,
    /// Sum of contributions across all streets of the current hand.
    pub total_bet_this_hand: Chips,
    pub has_acted_this_street: bool,
    pub is_connected: bool,
    /// Display-only tag of the last action, e.g. `"raise 120"`.
    pub last_action: Option<String>,
    /// Count of rebuys taken, each worth `initial_chips`.
    pub total_rebuys: u32,
    /// Count of cashouts taken, each worth `initial_chips`.
    pub total_cashouts: u32,
}

impl Player {
    pub fn new(id: &str, name: &str, emoji: &str, chips: Chips) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            emoji: emoji.to_string(),
            chips,
            seat: -1,
            ready: false,
            status: PlayerStatus::SittingOut,
            current_bet: 0,
            total_bet_this_hand: 0,
            has_acted_this_street: false,
            is_connected: false,
            last_action: None,
            total_rebuys: 0,
            total_cashouts: 0,
        }
    }

    pub fn is_seated(&self) -> bool {
        self.seat >= 0
    }
}

/// One pot at showdown. `id` is positional (`pot-0` is the lowest stratum)
/// and stable across rebuilds within a hand, so settlement proposals can
/// reference pots safely.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Pot {
    pub id: String,
    pub amount: Chips,
    pub eligible_players: Vec<PlayerId>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SettlementProposal {
    pub proposer_id: PlayerId,
    /// Pot id -> winners, each a non-empty subset of that pot's eligibles.
    pub pot_winners: BTreeMap<String, Vec<PlayerId>>,
    pub confirmed_by: BTreeSet<PlayerId>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandState {
    pub phase: HandPhase,
    pub dealer_seat: i32,
    pub sb_seat: i32,
    pub bb_seat: i32,
    /// Highest `current_bet` on the table this street.
    pub current_bet: Chips,
    /// Sum of every player's `total_bet_this_hand`.
    pub pot: Chips,
    pub pots: Vec<Pot>,
    pub current_player_id: Option<PlayerId>,
    /// Player ids rotated so the first to act this street is at index 0.
    pub action_order: Vec<PlayerId>,
    pub action_index: usize,
    pub last_raiser_id: Option<PlayerId>,
    pub settlement_proposal: Option<SettlementProposal>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub status: RoomStatus,
    pub owner_id: PlayerId,
    pub sb_amount: Chips,
    pub bb_amount: Chips,
    pub initial_chips: Chips,
    /// 0 means rebuy only at zero chips; otherwise rebuy while at or below.
    pub rebuy_minimum: Chips,
    /// 0 means unlimited; otherwise cashout is forced above this stack.
    pub max_chips: Chips,
    pub hand_interval: u64,
    pub players: BTreeMap<PlayerId, Player>,
    pub seats: Vec<Option<PlayerId>>,
    pub hand: Option<HandState>,
    /// Count of completed hands.
    pub hand_number: u32,
    /// Button position of the previous hand; -1 before the first hand.
    #[serde(default = "no_seat")]
    pub last_dealer_seat: i32,
    /// Epoch seconds of the moment the last connected player dropped, used
    /// by the idle-room sweep. None while anyone is connected.
    #[serde(default)]
    pub last_all_disconnected_at: Option<i64>,
}

fn no_seat() -> i32 {
    -1
}

impl Room {
    pub fn player(&self, player_id: &str) -> Result<&Player, GameError> {
        self.players.get(player_id).ok_or(GameError::NotFound)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Result<&mut Player, GameError> {
        self.players.get_mut(player_id).ok_or(GameError::NotFound)
    }

    /// Seated players in seat order.
    pub fn seated_players(&self) -> Vec<&Player> {
        self.seats
            .iter()
            .flatten()
            .filter_map(|id| self.players.get(id))
            .filter(|p| p.is_seated())
            .collect()
    }

    pub fn seated_ids(&self) -> Vec<PlayerId> {
        self.seated_players().iter().map(|p| p.id.clone()).collect()
    }

    pub fn occupied_seats(&self) -> Vec<usize> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i))
            .collect()
    }

    /// Next occupied seat strictly after `after`, wrapping to the lowest.
    pub fn next_occupied_seat(&self, after: i32) -> Option<usize> {
        let occupied = self.occupied_seats();
        occupied
            .iter()
            .find(|&&s| (s as i32) > after)
            .or_else(|| occupied.first())
            .copied()
    }

    pub fn seat_holder(&self, seat: usize) -> Result<PlayerId, GameError> {
        self.seats
            .get(seat)
            .and_then(|s| s.clone())
            .ok_or_else(|| GameError::Internal(format!("seat {seat} unexpectedly empty")))
    }

    /// Seated players still contesting the hand (not folded, not sitting out).
    pub fn active_players(&self) -> Vec<&Player> {
        self.seated_players()
            .into_iter()
            .filter(|p| matches!(p.status, PlayerStatus::Active | PlayerStatus::AllIn))
            .collect()
    }

    /// Active players who can still bet (not all-in).
    pub fn actionable_players(&self) -> Vec<&Player> {
        self.seated_players()
            .into_iter()
            .filter(|p| p.status == PlayerStatus::Active)
            .collect()
    }

    /// Ids of seated, non-folded players: the settlement electorate.
    pub fn non_folded_ids(&self) -> BTreeSet<PlayerId> {
        self.active_players().iter().map(|p| p.id.clone()).collect()
    }

    pub fn must_rebuy(&self, player: &Player) -> bool {
        if self.rebuy_minimum == 0 {
            player.chips == 0
        } else {
            player.chips <= self.rebuy_minimum
        }
    }

    pub fn must_cashout(&self, player: &Player) -> bool {
        self.max_chips > 0 && player.chips > self.max_chips
    }

    pub fn connected_count(&self) -> usize {
        self.players.values().filter(|p| p.is_connected).count()
    }

    pub fn all_disconnected(&self) -> bool {
        self.players.values().all(|p| !p.is_connected)
    }
}

/// Sanity check used by tests and the actor in debug builds: the seat map and
/// the player records must agree.
pub fn seats_consistent(room: &Room) -> bool {
    let forward = room.seats.iter().enumerate().all(|(i, slot)| match slot {
        Some(id) => room
            .players
            .get(id)
            .is_some_and(|p| p.seat == i as i32),
        None => !room.players.values().any(|p| p.seat == i as i32),
    });
    let backward = room.players.values().all(|p| {
        !p.is_seated()
            || room
                .seats
                .get(p.seat as usize)
                .is_some_and(|s| s.as_deref() == Some(p.id.as_str()))
    });
    forward && backward && room.seats.len() == SEATS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with_seats(ids: &[(&str, usize)]) -> Room {
        let mut players = BTreeMap::new();
        let mut seats = vec![None; SEATS];
        for (id, seat) in ids {
            let mut p = Player::new(id, id, "🦊", 1000);
            p.seat = *seat as i32;
            p.status = PlayerStatus::Active;
            seats[*seat] = Some(id.to_string());
            players.insert(id.to_string(), p);
        }
        Room {
            id: "TEST01".to_string(),
            status: RoomStatus::Waiting,
            owner_id: ids[0].0.to_string(),
            sb_amount: 10,
            bb_amount: 20,
            initial_chips: 1000,
            rebuy_minimum: 0,
            max_chips: 0,
            hand_interval: 5,
            players,
            seats,
            hand: None,
            hand_number: 0,
            last_dealer_seat: -1,
            last_all_disconnected_at: None,
        }
    }

    #[test]
    fn seated_players_come_back_in_seat_order() {
        let room = room_with_seats(&[("c", 7), ("a", 2), ("b", 4)]);
        let order: Vec<&str> = room.seated_players().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn next_occupied_seat_wraps() {
        let room = room_with_seats(&[("a", 2), ("b", 4), ("c", 7)]);
        assert_eq!(room.next_occupied_seat(-1), Some(2));
        assert_eq!(room.next_occupied_seat(2), Some(4));
        assert_eq!(room.next_occupied_seat(7), Some(2));
        assert_eq!(room.next_occupied_seat(11), Some(2));
    }

    #[test]
    fn rebuy_gate_at_zero_threshold() {
        let mut room = room_with_seats(&[("a", 0), ("b", 1)]);
        let mut broke = room.players.get("a").unwrap().clone();
        assert!(!room.must_rebuy(&broke));
        broke.chips = 0;
        assert!(room.must_rebuy(&broke));
        room.rebuy_minimum = 100;
        broke.chips = 80;
        assert!(room.must_rebuy(&broke));
        broke.chips = 101;
        assert!(!room.must_rebuy(&broke));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let room = room_with_seats(&[("a", 0), ("b", 1)]);
        let bytes = serde_json::to_vec(&room).unwrap();
        let restored: Room = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(room, restored);
        assert!(seats_consistent(&restored));
    }

    #[test]
    fn wire_spellings_are_snake_case() {
        let json = serde_json::to_value(PlayerStatus::AllIn).unwrap();
        assert_eq!(json, serde_json::json!("all_in"));
        let json = serde_json::to_value(HandPhase::Preflop).unwrap();
        assert_eq!(json, serde_json::json!("preflop"));
        let json = serde_json::to_value(RoomStatus::Waiting).unwrap();
        assert_eq!(json, serde_json::json!("waiting"));
    }
}
