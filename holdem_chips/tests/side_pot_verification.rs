//! Side-pot construction verified end-to-end and by property: pot amounts
//! always sum to the hand pot, eligibility shrinks as strata climb, and
//! folded contributors never win.

use std::collections::BTreeMap;

use holdem_chips::game::engine;
use holdem_chips::game::pot::build_pots;
use holdem_chips::{
    Chips, HandPhase, Player, PlayerAction, PlayerStatus, Room, RoomConfig, RoomStatus, SEATS,
};
use proptest::prelude::*;

fn cascade_room() -> Room {
    // Stacks 100 / 200 / 1000, blinds 10/20: the literal three-way cascade.
    let config = RoomConfig {
        sb_amount: 10,
        initial_chips: 1000,
        rebuy_minimum: 0,
        max_chips: 0,
        hand_interval: 5,
    };
    let mut room = config.new_room("SIDE01".to_string(), "p1".to_string(), "P1", "🦊", 0);
    engine::join(&mut room, "p2", "P2", "🐻").unwrap();
    engine::join(&mut room, "p3", "P3", "🦉").unwrap();
    engine::sit(&mut room, "p2", 1).unwrap();
    engine::sit(&mut room, "p3", 2).unwrap();
    room.players.get_mut("p1").unwrap().chips = 100;
    room.players.get_mut("p2").unwrap().chips = 200;
    for id in ["p1", "p2", "p3"] {
        engine::set_ready(&mut room, id, true).unwrap();
    }
    room
}

#[test]
fn three_way_all_in_cascade_builds_two_pots() {
    let mut room = cascade_room();
    // Dealer p1 is UTG three-handed; p2 posted 10, p3 posted 20.
    engine::take_action(&mut room, "p1", PlayerAction::AllIn, 0).unwrap();
    engine::take_action(&mut room, "p2", PlayerAction::AllIn, 0).unwrap();
    engine::take_action(&mut room, "p3", PlayerAction::Call, 0).unwrap();

    let hand = room.hand.as_ref().unwrap();
    assert_eq!(hand.phase, HandPhase::Showdown);
    assert_eq!(hand.pot, 500);
    assert_eq!(hand.pots.len(), 2);

    let main = &hand.pots[0];
    assert_eq!(main.id, "pot-0");
    assert_eq!(main.amount, 300);
    assert_eq!(main.eligible_players, vec!["p1", "p2", "p3"]);

    let side = &hand.pots[1];
    assert_eq!(side.id, "pot-1");
    assert_eq!(side.amount, 200);
    assert_eq!(side.eligible_players, vec!["p2", "p3"]);
}

#[test]
fn cascade_settles_to_the_covering_caller() {
    let mut room = cascade_room();
    engine::take_action(&mut room, "p1", PlayerAction::AllIn, 0).unwrap();
    engine::take_action(&mut room, "p2", PlayerAction::AllIn, 0).unwrap();
    engine::take_action(&mut room, "p3", PlayerAction::Call, 0).unwrap();

    let mut winners = BTreeMap::new();
    winners.insert("pot-0".to_string(), vec!["p3".to_string()]);
    winners.insert("pot-1".to_string(), vec!["p3".to_string()]);
    engine::propose_settlement(&mut room, "p3", winners).unwrap();
    engine::confirm_settlement(&mut room, "p1").unwrap();
    engine::confirm_settlement(&mut room, "p2").unwrap();

    assert_eq!(room.status, RoomStatus::Waiting);
    assert_eq!(room.players["p1"].chips, 0);
    assert_eq!(room.players["p2"].chips, 0);
    assert_eq!(room.players["p3"].chips, 1300);
}

#[test]
fn three_distinct_stacks_make_three_pots_with_shrinking_eligibles() {
    let config = RoomConfig {
        sb_amount: 10,
        initial_chips: 1000,
        rebuy_minimum: 0,
        max_chips: 0,
        hand_interval: 5,
    };
    let mut room = config.new_room("SIDE02".to_string(), "p1".to_string(), "P1", "🦊", 0);
    for (id, seat) in [("p2", 1), ("p3", 2), ("p4", 3)] {
        engine::join(&mut room, id, id, "🐺").unwrap();
        engine::sit(&mut room, id, seat).unwrap();
    }
    room.players.get_mut("p2").unwrap().chips = 80;
    room.players.get_mut("p3").unwrap().chips = 150;
    for id in ["p1", "p2", "p3", "p4"] {
        engine::set_ready(&mut room, id, true).unwrap();
    }
    // Dealer p1, SB p2 (80), BB p3 (150), UTG p4 (1000).
    engine::take_action(&mut room, "p4", PlayerAction::Raise, 150).unwrap();
    engine::take_action(&mut room, "p1", PlayerAction::Fold, 0).unwrap();
    engine::take_action(&mut room, "p2", PlayerAction::AllIn, 0).unwrap();
    engine::take_action(&mut room, "p3", PlayerAction::AllIn, 0).unwrap();

    let hand = room.hand.as_ref().unwrap();
    assert_eq!(hand.phase, HandPhase::Showdown);
    // Levels: 80 (p2), 150 (p3, p4). pot-0: 80*3, pot-1: 70*2.
    assert_eq!(hand.pots.len(), 2);
    assert_eq!(hand.pots[0].amount, 240);
    assert_eq!(hand.pots[0].eligible_players, vec!["p2", "p3", "p4"]);
    assert_eq!(hand.pots[1].amount, 140);
    assert_eq!(hand.pots[1].eligible_players, vec!["p3", "p4"]);
    let total: Chips = hand.pots.iter().map(|p| p.amount).sum();
    assert_eq!(total, hand.pot);
}

fn pot_fixture(entries: &[(&str, usize, Chips, PlayerStatus)]) -> Room {
    let mut players = BTreeMap::new();
    let mut seats = vec![None; SEATS];
    for (id, seat, total, status) in entries {
        let mut p = Player::new(id, id, "🃏", 0);
        p.seat = *seat as i32;
        p.total_bet_this_hand = *total;
        p.status = *status;
        seats[*seat] = Some(id.to_string());
        players.insert(id.to_string(), p);
    }
    Room {
        id: "FIXTUR".to_string(),
        status: RoomStatus::Playing,
        owner_id: entries[0].0.to_string(),
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

proptest! {
    /// Whatever the contribution profile, the strata account for every chip.
    #[test]
    fn pots_always_sum_to_total_contributions(
        contributions in prop::collection::vec(1i64..=500, 2..=8),
        folded_mask in prop::collection::vec(any::<bool>(), 2..=8),
    ) {
        let entries: Vec<(String, usize, Chips, PlayerStatus)> = contributions
            .iter()
            .enumerate()
            .map(|(i, &total)| {
                let folded = folded_mask.get(i).copied().unwrap_or(false);
                // Keep at least the two highest contributors alive so the
                // hand is a real showdown, not a walkover.
                let status = if folded && i >= 2 {
                    PlayerStatus::Folded
                } else {
                    PlayerStatus::AllIn
                };
                (format!("p{i}"), i, total, status)
            })
            .collect();
        let borrowed: Vec<(&str, usize, Chips, PlayerStatus)> = entries
            .iter()
            .map(|(id, seat, total, status)| (id.as_str(), *seat, *total, *status))
            .collect();
        let room = pot_fixture(&borrowed);
        let pots = build_pots(&room);

        let total: Chips = contributions.iter().sum();
        let pot_sum: Chips = pots.iter().map(|p| p.amount).sum();
        prop_assert_eq!(pot_sum, total);

        // Eligibility shrinks (or stays) as strata climb.
        for pair in pots.windows(2) {
            for id in &pair[1].eligible_players {
                prop_assert!(pair[0].eligible_players.contains(id));
            }
        }

        // Folded players are never eligible anywhere.
        for pot in &pots {
            for (id, _, _, status) in &borrowed {
                if *status == PlayerStatus::Folded {
                    prop_assert!(!pot.eligible_players.contains(&id.to_string()));
                }
            }
        }

        // Pot ids are positional and deterministic.
        for (i, pot) in pots.iter().enumerate() {
            prop_assert_eq!(pot.id.clone(), format!("pot-{i}"));
        }
    }
}
