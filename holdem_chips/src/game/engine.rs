//! Pure state transitions over a room snapshot.
//!
//! Every function takes `&mut Room` plus a command's arguments and returns
//! the advisory events the transition produced, or a [`GameError`] without
//! having observably mutated anything the caller keeps. The room actor
//! enforces that contract by applying transitions to a clone and swapping on
//! success, so these functions are free to fail mid-way.
//!
//! Wall-clock time is always an explicit parameter; nothing here reads a
//! clock, the network, or randomness.

use std::collections::BTreeMap;

use super::constants::{MIN_PLAYERS, SEATS};
use super::entities::{
    Chips, HandPhase, HandState, Player, PlayerAction, PlayerId, PlayerStatus, Room, RoomStatus,
};
use super::errors::GameError;
use super::events::{GameEvent, Settlement, Standing};
use super::pot::{build_pots, order_from_dealer};

type Transition = Result<Vec<GameEvent>, GameError>;

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// Add a player to the room with a fresh buy-in. Idempotent per player id so
/// a device re-joining after a reload gets its existing record back.
pub fn join(room: &mut Room, player_id: &str, name: &str, emoji: &str) -> Transition {
    if room.players.contains_key(player_id) {
        return Ok(Vec::new());
    }
    if room.status == RoomStatus::Finished {
        return Err(GameError::IllegalAction("game has ended".to_string()));
    }
    let player = Player::new(player_id, name, emoji, room.initial_chips);
    room.players.insert(player_id.to_string(), player);
    Ok(Vec::new())
}

/// Remove a player. Refused mid-hand; ownership moves to the first remaining
/// player when the owner walks away.
pub fn leave(room: &mut Room, player_id: &str, now: i64) -> Transition {
    if room.status == RoomStatus::Playing {
        return Err(GameError::IllegalAction(
            "cannot leave during a hand".to_string(),
        ));
    }
    let Some(player) = room.players.remove(player_id) else {
        return Ok(Vec::new());
    };
    if player.is_seated() {
        room.seats[player.seat as usize] = None;
    }
    if room.owner_id == player_id
        && let Some(next_owner) = room.players.keys().next().cloned()
    {
        room.owner_id = next_owner;
    }
    if room.all_disconnected() && room.last_all_disconnected_at.is_none() {
        room.last_all_disconnected_at = Some(now);
    }
    Ok(Vec::new())
}

/// Flip a player's connection flag and maintain the idle clock. With the
/// auto-fold policy enabled, a disconnect on the player's own turn folds
/// them; by default their turn simply keeps blocking.
pub fn set_connected(
    room: &mut Room,
    player_id: &str,
    connected: bool,
    now: i64,
    auto_fold: bool,
) -> Transition {
    room.player_mut(player_id)?.is_connected = connected;
    if connected {
        room.last_all_disconnected_at = None;
        return Ok(Vec::new());
    }
    if room.all_disconnected() && room.last_all_disconnected_at.is_none() {
        room.last_all_disconnected_at = Some(now);
    }
    let their_turn = room
        .hand
        .as_ref()
        .and_then(|h| h.current_player_id.as_deref())
        == Some(player_id);
    if auto_fold && room.status == RoomStatus::Playing && their_turn {
        return take_action(room, player_id, PlayerAction::Fold, 0);
    }
    Ok(Vec::new())
}

// ---------------------------------------------------------------------------
// Seating & readiness
// ---------------------------------------------------------------------------

pub fn sit(room: &mut Room, player_id: &str, seat: usize) -> Transition {
    if room.status != RoomStatus::Waiting {
        return Err(GameError::IllegalAction(
            "cannot change seats during a hand".to_string(),
        ));
    }
    if seat >= SEATS {
        return Err(GameError::Validation(format!("seat {seat} out of range")));
    }
    let player = room.player(player_id)?;
    if player.seat == seat as i32 {
        // Repeated sit on the same seat is a no-op.
        return Ok(Vec::new());
    }
    if player.is_seated() {
        return Err(GameError::AlreadySeated);
    }
    if room.occupied_seats().len() >= SEATS {
        return Err(GameError::RoomFull);
    }
    if room.seats[seat].is_some() {
        return Err(GameError::SeatTaken);
    }
    let player = room.player_mut(player_id)?;
    player.seat = seat as i32;
    player.status = PlayerStatus::Active;
    player.ready = false;
    room.seats[seat] = Some(player_id.to_string());
    Ok(vec![GameEvent::Sit {
        player_id: player_id.to_string(),
        seat,
    }])
}

pub fn stand(room: &mut Room, player_id: &str) -> Transition {
    if room.status != RoomStatus::Waiting {
        return Err(GameError::IllegalAction(
            "cannot stand during a hand".to_string(),
        ));
    }
    let player = room.player(player_id)?;
    if !player.is_seated() {
        return Err(GameError::IllegalAction("not seated".to_string()));
    }
    let seat = player.seat as usize;
    let player = room.player_mut(player_id)?;
    player.seat = -1;
    player.status = PlayerStatus::SittingOut;
    player.ready = false;
    player.current_bet = 0;
    player.total_bet_this_hand = 0;
    player.has_acted_this_street = false;
    player.last_action = None;
    room.seats[seat] = None;
    Ok(vec![GameEvent::Stand {
        player_id: player_id.to_string(),
    }])
}

/// Set readiness. Readying up is gated on the rebuy/cashout rules; a hand
/// starts automatically once every seated player is ready.
pub fn set_ready(room: &mut Room, player_id: &str, ready: bool) -> Transition {
    if room.status != RoomStatus::Waiting {
        return Err(GameError::IllegalAction(
            "game already in progress".to_string(),
        ));
    }
    let player = room.player(player_id)?;
    if !player.is_seated() {
        return Err(GameError::IllegalAction(
            "must take a seat first".to_string(),
        ));
    }
    if player.ready == ready {
        return Ok(Vec::new());
    }
    if ready {
        if room.must_cashout(player) {
            return Err(GameError::MustCashout);
        }
        if room.must_rebuy(player) {
            return Err(GameError::MustRebuy);
        }
    }
    room.player_mut(player_id)?.ready = ready;
    let mut events = vec![GameEvent::ReadyToggle {
        player_id: player_id.to_string(),
        ready,
    }];
    if ready {
        try_start_hand(room, &mut events)?;
    }
    Ok(events)
}

// ---------------------------------------------------------------------------
// Rebuy / cashout
// ---------------------------------------------------------------------------

pub fn rebuy(room: &mut Room, player_id: &str) -> Transition {
    if room.status != RoomStatus::Waiting {
        return Err(GameError::IllegalAction(
            "rebuys are only allowed between hands".to_string(),
        ));
    }
    let player = room.player(player_id)?;
    if !room.must_rebuy(player) {
        return Err(GameError::IllegalAction(
            "stack is too large to rebuy".to_string(),
        ));
    }
    let buy_in = room.initial_chips;
    let player = room.player_mut(player_id)?;
    player.chips += buy_in;
    player.total_rebuys += 1;
    Ok(vec![GameEvent::Rebuy {
        player_id: player_id.to_string(),
        chips: player.chips,
    }])
}

/// Remove one buy-in from an over-cap stack. Repeatable until the stack is
/// at or below `max_chips`.
pub fn cashout(room: &mut Room, player_id: &str) -> Transition {
    if room.status != RoomStatus::Waiting {
        return Err(GameError::IllegalAction(
            "cashouts are only allowed between hands".to_string(),
        ));
    }
    let player = room.player(player_id)?;
    if !room.must_cashout(player) {
        return Err(GameError::IllegalAction(
            "stack is not above the cashout cap".to_string(),
        ));
    }
    let buy_in = room.initial_chips;
    let player = room.player_mut(player_id)?;
    player.chips -= buy_in;
    player.total_cashouts += 1;
    Ok(vec![GameEvent::Cashout {
        player_id: player_id.to_string(),
        chips: player.chips,
    }])
}

// ---------------------------------------------------------------------------
// Hand start
// ---------------------------------------------------------------------------

fn try_start_hand(room: &mut Room, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
    let startable = {
        let seated = room.seated_players();
        seated.len() >= MIN_PLAYERS
            && seated.iter().all(|p| p.ready)
            && !seated
                .iter()
                .any(|p| room.must_rebuy(p) || room.must_cashout(p))
    };
    if !startable {
        return Ok(());
    }
    start_hand(room, events)
}

fn start_hand(room: &mut Room, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
    room.status = RoomStatus::Playing;

    for id in room.seated_ids() {
        let p = room.player_mut(&id)?;
        p.status = PlayerStatus::Active;
        p.ready = false;
        p.current_bet = 0;
        p.total_bet_this_hand = 0;
        p.has_acted_this_street = false;
        p.last_action = None;
    }

    let heads_up = room.seated_players().len() == 2;
    let dealer_seat = room
        .next_occupied_seat(room.last_dealer_seat)
        .ok_or_else(|| GameError::Internal("hand started with no seated players".to_string()))?;
    let no_next = || GameError::Internal("blind seat lookup failed".to_string());
    let (sb_seat, bb_seat) = if heads_up {
        // Heads-up: the button posts the small blind.
        let bb = room.next_occupied_seat(dealer_seat as i32).ok_or_else(no_next)?;
        (dealer_seat, bb)
    } else {
        let sb = room.next_occupied_seat(dealer_seat as i32).ok_or_else(no_next)?;
        let bb = room.next_occupied_seat(sb as i32).ok_or_else(no_next)?;
        (sb, bb)
    };
    room.last_dealer_seat = dealer_seat as i32;

    let sb_id = room.seat_holder(sb_seat)?;
    let bb_id = room.seat_holder(bb_seat)?;
    let sb_amount = room.sb_amount;
    let bb_amount = room.bb_amount;
    let sb_paid = post_blind(room, &sb_id, sb_amount)?;
    let bb_paid = post_blind(room, &bb_id, bb_amount)?;

    let mut hand = HandState {
        phase: HandPhase::Preflop,
        dealer_seat: dealer_seat as i32,
        sb_seat: sb_seat as i32,
        bb_seat: bb_seat as i32,
        // The table owes a full big blind even when nobody could post it.
        current_bet: bb_amount,
        pot: sb_paid + bb_paid,
        pots: Vec::new(),
        current_player_id: None,
        action_order: Vec::new(),
        action_index: 0,
        last_raiser_id: Some(bb_id),
        settlement_proposal: None,
    };
    hand.action_order = action_order_after(room, bb_seat);
    hand.current_player_id = hand.action_order.first().cloned();
    room.hand = Some(hand);

    events.push(GameEvent::HandStarted {
        dealer_seat: dealer_seat as i32,
    });

    // Blinds can leave nobody with chips to bet (two short stacks).
    let nobody_actionable = room.actionable_players().is_empty();
    if nobody_actionable {
        advance_streets(room, events)?;
    }
    Ok(())
}

fn post_blind(room: &mut Room, player_id: &str, amount: Chips) -> Result<Chips, GameError> {
    let paid = amount.min(room.player(player_id)?.chips);
    contribute_outside_hand(room, player_id, paid)?;
    Ok(paid)
}

/// Blind posting happens before `room.hand` exists, so the hand pot is
/// accounted separately by the caller.
fn contribute_outside_hand(room: &mut Room, player_id: &str, amount: Chips) -> Result<(), GameError> {
    let player = room.player_mut(player_id)?;
    player.chips -= amount;
    player.current_bet += amount;
    player.total_bet_this_hand += amount;
    if player.chips == 0 {
        player.status = PlayerStatus::AllIn;
    }
    Ok(())
}

/// Ids of players with `Active` status, rotated so the first occupied seat
/// after `after_seat` leads.
fn action_order_after(room: &Room, after_seat: usize) -> Vec<PlayerId> {
    let seated = room.seated_players();
    let mut rotated: Vec<&Player> = seated
        .iter()
        .filter(|p| p.seat as usize > after_seat)
        .chain(seated.iter().filter(|p| p.seat as usize <= after_seat))
        .copied()
        .collect();
    rotated.retain(|p| p.status == PlayerStatus::Active);
    rotated.into_iter().map(|p| p.id.clone()).collect()
}

// ---------------------------------------------------------------------------
// Betting
// ---------------------------------------------------------------------------

pub fn take_action(
    room: &mut Room,
    player_id: &str,
    action: PlayerAction,
    amount: Chips,
) -> Transition {
    if room.status != RoomStatus::Playing || room.hand.is_none() {
        return Err(GameError::IllegalAction("no hand in progress".to_string()));
    }
    let (table_bet, current) = {
        let hand = room.hand.as_ref().ok_or_else(no_hand)?;
        (hand.current_bet, hand.current_player_id.clone())
    };
    if current.as_deref() != Some(player_id) {
        return Err(GameError::NotYourTurn);
    }

    let bb_amount = room.bb_amount;
    let player = room.player(player_id)?;
    let player_name = player.name.clone();
    let (bet, chips, acted) = (player.current_bet, player.chips, player.has_acted_this_street);

    let mut new_table_bet = table_bet;
    let mut reopens = false;
    let detail;
    let event_amount;
    let tag;

    match action {
        PlayerAction::Fold => {
            room.player_mut(player_id)?.status = PlayerStatus::Folded;
            detail = "folded".to_string();
            event_amount = None;
            tag = "fold".to_string();
        }
        PlayerAction::Check => {
            if bet != table_bet {
                return Err(GameError::IllegalAction(
                    "cannot check while facing a bet".to_string(),
                ));
            }
            detail = "checked".to_string();
            event_amount = None;
            tag = "check".to_string();
        }
        PlayerAction::Call => {
            if table_bet <= bet {
                return Err(GameError::IllegalAction("nothing to call".to_string()));
            }
            let paid = (table_bet - bet).min(chips);
            contribute(room, player_id, paid)?;
            detail = format!("called {paid}");
            event_amount = Some(paid);
            tag = format!("call {paid}");
        }
        PlayerAction::Raise => {
            // A short all-in does not reopen the betting: anyone who already
            // acted against a fully-met bet keeps has_acted_this_street set
            // and may only call or fold.
            if acted {
                return Err(GameError::IllegalAction(
                    "betting is closed for you this street".to_string(),
                ));
            }
            if amount < table_bet + bb_amount {
                return Err(GameError::IllegalAction(format!(
                    "raise must be to at least {}",
                    table_bet + bb_amount
                )));
            }
            if amount > chips + bet {
                return Err(GameError::IllegalAction(
                    "raise exceeds your stack".to_string(),
                ));
            }
            contribute(room, player_id, amount - bet)?;
            new_table_bet = amount;
            reopens = true;
            detail = format!("raised to {amount}");
            event_amount = Some(amount);
            tag = format!("raise {amount}");
        }
        PlayerAction::AllIn => {
            if chips <= 0 {
                return Err(GameError::IllegalAction(
                    "no chips left to bet".to_string(),
                ));
            }
            contribute(room, player_id, chips)?;
            let committed = bet + chips;
            if committed >= table_bet + bb_amount {
                new_table_bet = committed;
                reopens = true;
            } else if committed > table_bet {
                // Raises the price to call without reopening the action.
                new_table_bet = committed;
            }
            detail = format!("all-in {committed}");
            event_amount = Some(committed);
            tag = format!("all-in {committed}");
        }
    }

    {
        let player = room.player_mut(player_id)?;
        player.has_acted_this_street = true;
        player.last_action = Some(tag);
    }
    if reopens {
        let others: Vec<PlayerId> = room
            .players
            .values()
            .filter(|p| p.id != player_id && p.is_seated() && p.status == PlayerStatus::Active)
            .map(|p| p.id.clone())
            .collect();
        for id in others {
            room.player_mut(&id)?.has_acted_this_street = false;
        }
    }
    {
        let hand = room.hand.as_mut().ok_or_else(no_hand)?;
        hand.current_bet = new_table_bet;
        if reopens {
            hand.last_raiser_id = Some(player_id.to_string());
        }
    }

    let mut events = vec![GameEvent::Action {
        player_id: player_id.to_string(),
        player_name,
        action,
        detail,
        amount: event_amount,
    }];
    resolve_after_action(room, &mut events)?;
    Ok(events)
}

fn contribute(room: &mut Room, player_id: &str, amount: Chips) -> Result<(), GameError> {
    let player = room.player_mut(player_id)?;
    if amount > player.chips {
        return Err(GameError::Internal(
            "contribution exceeds stack".to_string(),
        ));
    }
    player.chips -= amount;
    player.current_bet += amount;
    player.total_bet_this_hand += amount;
    if player.chips == 0 {
        player.status = PlayerStatus::AllIn;
    }
    room.hand.as_mut().ok_or_else(no_hand)?.pot += amount;
    Ok(())
}

fn no_hand() -> GameError {
    GameError::Internal("hand state missing while playing".to_string())
}

/// Decide what follows an action: a fold-out win, the next player's turn, or
/// a street (or several) advancing.
fn resolve_after_action(room: &mut Room, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
    if room.active_players().len() <= 1 {
        return end_hand_single_winner(room, events);
    }
    let table_bet = room.hand.as_ref().ok_or_else(no_hand)?.current_bet;
    let pending = room
        .actionable_players()
        .iter()
        .any(|p| !p.has_acted_this_street || p.current_bet < table_bet);
    if pending {
        advance_turn(room)
    } else {
        advance_streets(room, events)
    }
}

/// Move the cursor to the next player in `action_order` who still owes a
/// decision this street.
fn advance_turn(room: &mut Room) -> Result<(), GameError> {
    let (order, index, table_bet) = {
        let hand = room.hand.as_ref().ok_or_else(no_hand)?;
        (hand.action_order.clone(), hand.action_index, hand.current_bet)
    };
    if order.is_empty() {
        return Ok(());
    }
    for step in 1..=order.len() {
        let i = (index + step) % order.len();
        let Some(player) = room.players.get(&order[i]) else {
            continue;
        };
        if player.status == PlayerStatus::Active
            && (!player.has_acted_this_street || player.current_bet < table_bet)
        {
            let hand = room.hand.as_mut().ok_or_else(no_hand)?;
            hand.action_index = i;
            hand.current_player_id = Some(order[i].clone());
            return Ok(());
        }
    }
    Ok(())
}

/// Advance to the next street; when nobody can bet any more, keep advancing
/// so the hand runs out to showdown with a `phase_change` per street for the
/// physical table to deal along.
fn advance_streets(room: &mut Room, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
    loop {
        let phase = room.hand.as_ref().ok_or_else(no_hand)?.phase;
        let next = match phase {
            HandPhase::Preflop => HandPhase::Flop,
            HandPhase::Flop => HandPhase::Turn,
            HandPhase::Turn => HandPhase::River,
            HandPhase::River => HandPhase::Showdown,
            _ => {
                return Err(GameError::Internal(
                    "street advance outside a betting street".to_string(),
                ));
            }
        };

        for id in room.seated_ids() {
            let p = room.player_mut(&id)?;
            p.current_bet = 0;
            p.has_acted_this_street = false;
        }
        let pots = build_pots(room);
        let dealer_seat = room.hand.as_ref().ok_or_else(no_hand)?.dealer_seat;
        let order = if next == HandPhase::Showdown {
            Vec::new()
        } else {
            // Post-flop the first active player left of the button opens.
            action_order_after(room, dealer_seat.max(0) as usize)
        };
        // A lone player with chips has nobody left to bet against, so the
        // hand runs out to showdown without further action.
        let betting_open = order.len() >= 2;

        let hand = room.hand.as_mut().ok_or_else(no_hand)?;
        hand.phase = next;
        hand.current_bet = 0;
        hand.last_raiser_id = None;
        hand.pots = pots;
        hand.action_index = 0;
        hand.current_player_id = if betting_open {
            order.first().cloned()
        } else {
            None
        };
        hand.action_order = if betting_open { order } else { Vec::new() };
        events.push(GameEvent::PhaseChange { phase: next });

        if next == HandPhase::Showdown || betting_open {
            return Ok(());
        }
    }
}

fn end_hand_single_winner(room: &mut Room, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
    let pot = room.hand.as_ref().ok_or_else(no_hand)?.pot;
    let winner_id = room
        .active_players()
        .first()
        .map(|p| p.id.clone())
        .ok_or_else(|| GameError::Internal("hand ended with no contenders".to_string()))?;
    let winner = room.player_mut(&winner_id)?;
    winner.chips += pot;
    let winner_name = winner.name.clone();
    events.push(GameEvent::SingleWinner {
        winner: winner_id,
        winner_name,
        pot,
    });
    finish_hand(room)
}

fn finish_hand(room: &mut Room) -> Result<(), GameError> {
    if let Some(hand) = room.hand.take() {
        room.last_dealer_seat = hand.dealer_seat;
    }
    room.status = RoomStatus::Waiting;
    room.hand_number += 1;
    for id in room.seated_ids() {
        let p = room.player_mut(&id)?;
        p.status = PlayerStatus::Active;
        p.ready = false;
        p.current_bet = 0;
        p.total_bet_this_hand = 0;
        p.has_acted_this_street = false;
        p.last_action = None;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Settlement consensus
// ---------------------------------------------------------------------------

/// Propose who wins each pot. Only seated, non-folded players may propose;
/// a standing proposal can only be replaced by its own proposer (or cleared
/// by a rejection).
pub fn propose_settlement(
    room: &mut Room,
    player_id: &str,
    pot_winners: BTreeMap<String, Vec<PlayerId>>,
) -> Transition {
    require_showdown_voter(room, player_id)?;
    let hand = room.hand.as_ref().ok_or_else(no_hand)?;
    if let Some(proposal) = &hand.settlement_proposal
        && proposal.proposer_id != player_id
    {
        return Err(GameError::Conflict(
            "a settlement proposal is already pending".to_string(),
        ));
    }
    if pot_winners.len() != hand.pots.len() {
        return Err(GameError::Validation(
            "winners must be named for every pot and nothing else".to_string(),
        ));
    }
    let mut normalized = BTreeMap::new();
    for pot in &hand.pots {
        let winners = pot_winners
            .get(&pot.id)
            .ok_or_else(|| GameError::Validation(format!("missing winners for {}", pot.id)))?;
        if winners.is_empty() {
            return Err(GameError::Validation(format!(
                "no winners named for {}",
                pot.id
            )));
        }
        let mut winners = winners.clone();
        winners.sort();
        winners.dedup();
        for winner in &winners {
            if !pot.eligible_players.contains(winner) {
                return Err(GameError::Validation(format!(
                    "{winner} is not eligible for {}",
                    pot.id
                )));
            }
        }
        normalized.insert(pot.id.clone(), winners);
    }
    let proposer_name = room.player(player_id)?.name.clone();
    let hand = room.hand.as_mut().ok_or_else(no_hand)?;
    hand.settlement_proposal = Some(super::entities::SettlementProposal {
        proposer_id: player_id.to_string(),
        pot_winners: normalized,
        confirmed_by: [player_id.to_string()].into(),
    });
    Ok(vec![GameEvent::SettlementProposed {
        proposer_id: player_id.to_string(),
        proposer_name,
    }])
}

/// Confirm the standing proposal. Confirmations are sticky for a proposal
/// instance; once every seated, non-folded player has confirmed, the pots
/// pay out and the hand ends.
pub fn confirm_settlement(room: &mut Room, player_id: &str) -> Transition {
    require_showdown_voter(room, player_id)?;
    let electorate = room.non_folded_ids();
    let hand = room.hand.as_mut().ok_or_else(no_hand)?;
    let Some(proposal) = hand.settlement_proposal.as_mut() else {
        return Err(GameError::IllegalAction(
            "no settlement proposal to confirm".to_string(),
        ));
    };
    if !proposal.confirmed_by.insert(player_id.to_string()) {
        return Ok(Vec::new());
    }
    let confirmed = proposal.confirmed_by.len();
    let required = electorate.len();
    if electorate.iter().all(|id| proposal.confirmed_by.contains(id)) {
        let mut events = Vec::new();
        ratify_settlement(room, &mut events)?;
        return Ok(events);
    }
    Ok(vec![GameEvent::SettlementConfirmed {
        player_id: player_id.to_string(),
        confirmed,
        required,
    }])
}

/// Discard the standing proposal and return to the pre-proposal showdown.
pub fn reject_settlement(room: &mut Room, player_id: &str) -> Transition {
    require_showdown_voter(room, player_id)?;
    let rejector_name = room.player(player_id)?.name.clone();
    let hand = room.hand.as_mut().ok_or_else(no_hand)?;
    if hand.settlement_proposal.take().is_none() {
        return Err(GameError::IllegalAction(
            "no settlement proposal to reject".to_string(),
        ));
    }
    Ok(vec![GameEvent::SettlementRejected {
        player_id: player_id.to_string(),
        rejector_name,
    }])
}

fn require_showdown_voter(room: &Room, player_id: &str) -> Result<(), GameError> {
    let hand = room
        .hand
        .as_ref()
        .ok_or_else(|| GameError::IllegalAction("no hand in progress".to_string()))?;
    if hand.phase != HandPhase::Showdown {
        return Err(GameError::IllegalAction("not in showdown".to_string()));
    }
    let player = room.player(player_id)?;
    if !player.is_seated() || !matches!(player.status, PlayerStatus::Active | PlayerStatus::AllIn) {
        return Err(GameError::IllegalAction(
            "only players in the hand take part in settlement".to_string(),
        ));
    }
    Ok(())
}

fn ratify_settlement(room: &mut Room, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
    let (pots, winners_by_pot, dealer_seat) = {
        let hand = room.hand.as_ref().ok_or_else(no_hand)?;
        let proposal = hand
            .settlement_proposal
            .as_ref()
            .ok_or_else(|| GameError::Internal("ratified without a proposal".to_string()))?;
        (
            hand.pots.clone(),
            proposal.pot_winners.clone(),
            hand.dealer_seat,
        )
    };
    let mut settlements = Vec::new();
    for pot in &pots {
        let winners = winners_by_pot
            .get(&pot.id)
            .ok_or_else(|| GameError::Internal(format!("proposal lost winners for {}", pot.id)))?;
        let ordered = order_from_dealer(room, winners, dealer_seat);
        if ordered.is_empty() {
            return Err(GameError::Internal(format!(
                "no payable winners for {}",
                pot.id
            )));
        }
        let share = pot.amount / ordered.len() as Chips;
        let remainder = pot.amount % ordered.len() as Chips;
        for (i, winner_id) in ordered.iter().enumerate() {
            // Odd chips go to the first winner left of the button.
            let award = share + if i == 0 { remainder } else { 0 };
            let player = room.player_mut(winner_id)?;
            player.chips += award;
            settlements.push(Settlement {
                pot_id: pot.id.clone(),
                player_id: winner_id.clone(),
                player_name: player.name.clone(),
                amount: award,
            });
        }
    }
    events.push(GameEvent::Settled { settlements });
    finish_hand(room)
}

// ---------------------------------------------------------------------------
// End of game
// ---------------------------------------------------------------------------

/// Owner-only. Freezes the room and reports final standings; nets across the
/// table always sum to zero because chips only ever move between stacks.
pub fn end_game(room: &mut Room, player_id: &str) -> Transition {
    if room.owner_id != player_id {
        return Err(GameError::IllegalAction(
            "only the room owner can end the game".to_string(),
        ));
    }
    match room.status {
        RoomStatus::Playing => {
            return Err(GameError::IllegalAction(
                "cannot end the game during a hand".to_string(),
            ));
        }
        RoomStatus::Finished => {
            return Err(GameError::Conflict("game already ended".to_string()));
        }
        RoomStatus::Waiting => {}
    }
    room.status = RoomStatus::Finished;
    let buy_in = room.initial_chips;
    let standings: Vec<Standing> = room
        .players
        .values()
        .map(|p| Standing {
            player_id: p.id.clone(),
            name: p.name.clone(),
            chips: p.chips,
            total_rebuys: p.total_rebuys,
            total_cashouts: p.total_cashouts,
            net: p.chips + p.total_cashouts as Chips * buy_in
                - p.total_rebuys as Chips * buy_in
                - buy_in,
        })
        .collect();
    Ok(vec![GameEvent::GameEnded { standings }])
}
