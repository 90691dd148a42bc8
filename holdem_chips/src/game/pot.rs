//! Main/side pot construction and share splitting.
//!
//! Pots are always rebuilt from scratch out of `total_bet_this_hand` at
//! street boundaries, never mutated incrementally. That keeps pot math a pure
//! function of contributions and immune to ordering bugs.

use super::constants::SEATS;
use super::entities::{Chips, PlayerId, PlayerStatus, Pot, Room};

/// Stratify this hand's contributions into pots.
///
/// Distinct contribution levels (folded players included) are walked lowest
/// first; each stratum holds `(level - previous) * contributors_at_level`
/// chips and is winnable by the non-folded contributors at that level.
/// Adjacent strata contested by the same players are merged, and a top
/// stratum nobody can win (a folded over-contribution) collapses into the
/// pot below it so the pots always sum to `hand.pot`.
pub fn build_pots(room: &Room) -> Vec<Pot> {
    let contributors: Vec<(&PlayerId, Chips, PlayerStatus)> = room
        .seated_players()
        .into_iter()
        .filter(|p| p.total_bet_this_hand > 0)
        .map(|p| (&p.id, p.total_bet_this_hand, p.status))
        .collect();
    if contributors.is_empty() {
        return Vec::new();
    }

    let mut levels: Vec<Chips> = contributors.iter().map(|(_, amount, _)| *amount).collect();
    levels.sort_unstable();
    levels.dedup();

    let mut strata: Vec<(Chips, Vec<PlayerId>)> = Vec::new();
    let mut prev = 0;
    for level in levels {
        let in_for_level = contributors.iter().filter(|(_, amount, _)| *amount >= level);
        let amount = (level - prev) * in_for_level.clone().count() as Chips;
        let eligible: Vec<PlayerId> = in_for_level
            .filter(|(_, _, status)| *status != PlayerStatus::Folded)
            .map(|(id, _, _)| (*id).clone())
            .collect();
        if amount > 0 {
            if eligible.is_empty() {
                if let Some(below) = strata.last_mut() {
                    below.0 += amount;
                }
            } else {
                strata.push((amount, eligible));
            }
        }
        prev = level;
    }

    let mut merged: Vec<(Chips, Vec<PlayerId>)> = Vec::new();
    for (amount, eligible) in strata {
        match merged.last_mut() {
            Some(below) if below.1 == eligible => below.0 += amount,
            _ => merged.push((amount, eligible)),
        }
    }

    merged
        .into_iter()
        .enumerate()
        .map(|(i, (amount, eligible_players))| Pot {
            id: format!("pot-{i}"),
            amount,
            eligible_players,
        })
        .collect()
}

/// Order `ids` by seat, scanning clockwise from the seat left of the dealer.
/// The first entry receives the odd chips of a split pot.
pub fn order_from_dealer(room: &Room, ids: &[PlayerId], dealer_seat: i32) -> Vec<PlayerId> {
    let origin = (dealer_seat.max(0) as usize + 1) % SEATS;
    let mut positioned: Vec<(usize, PlayerId)> = ids
        .iter()
        .filter_map(|id| {
            let player = room.players.get(id)?;
            if !player.is_seated() {
                return None;
            }
            let seat = player.seat as usize;
            Some(((seat + SEATS - origin) % SEATS, id.clone()))
        })
        .collect();
    positioned.sort();
    positioned.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::SEATS;
    use crate::game::entities::{Player, Room, RoomStatus};
    use std::collections::BTreeMap;

    fn room_with(players: &[(&str, usize, Chips, PlayerStatus)]) -> Room {
        let mut map = BTreeMap::new();
        let mut seats = vec![None; SEATS];
        for (id, seat, total, status) in players {
            let mut p = Player::new(id, id, "🃏", 0);
            p.seat = *seat as i32;
            p.total_bet_this_hand = *total;
            p.status = *status;
            seats[*seat] = Some(id.to_string());
            map.insert(id.to_string(), p);
        }
        Room {
            id: "POTTED".to_string(),
            status: RoomStatus::Playing,
            owner_id: players[0].0.to_string(),
            sb_amount: 10,
            bb_amount: 20,
            initial_chips: 1000,
            rebuy_minimum: 0,
            max_chips: 0,
            hand_interval: 5,
            players: map,
            seats,
            hand: None,
            hand_number: 0,
            last_dealer_seat: -1,
            last_all_disconnected_at: None,
        }
    }

    #[test]
    fn all_in_cascade_builds_shrinking_pots() {
        // 100 / 200 / 200: everyone contests the first 300, the top 200 is
        // between the two deep stacks.
        let room = room_with(&[
            ("p1", 0, 100, PlayerStatus::AllIn),
            ("p2", 1, 200, PlayerStatus::AllIn),
            ("p3", 2, 200, PlayerStatus::Active),
        ]);
        let pots = build_pots(&room);
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[0].id, "pot-0");
        assert_eq!(pots[0].amount, 300);
        assert_eq!(pots[0].eligible_players, vec!["p1", "p2", "p3"]);
        assert_eq!(pots[1].id, "pot-1");
        assert_eq!(pots[1].amount, 200);
        assert_eq!(pots[1].eligible_players, vec!["p2", "p3"]);
    }

    #[test]
    fn folded_chips_stay_in_but_cannot_win() {
        let room = room_with(&[
            ("folder", 0, 60, PlayerStatus::Folded),
            ("p2", 1, 100, PlayerStatus::Active),
            ("p3", 2, 100, PlayerStatus::Active),
        ]);
        let pots = build_pots(&room);
        let total: Chips = pots.iter().map(|p| p.amount).sum();
        assert_eq!(total, 260);
        for pot in &pots {
            assert!(!pot.eligible_players.contains(&"folder".to_string()));
        }
    }

    #[test]
    fn identical_eligible_sets_merge() {
        // The folder's 60 splits the levels but both strata above it are
        // contested by the same two players, so they come back as one pot.
        let room = room_with(&[
            ("folder", 0, 60, PlayerStatus::Folded),
            ("p2", 1, 100, PlayerStatus::Active),
            ("p3", 2, 100, PlayerStatus::Active),
        ]);
        let pots = build_pots(&room);
        assert_eq!(pots.len(), 1);
        assert_eq!(pots[0].amount, 260);
        assert_eq!(pots[0].eligible_players, vec!["p2", "p3"]);
    }

    #[test]
    fn folded_over_contribution_rolls_into_the_pot_below() {
        // The folder put in more than either surviving all-in; nobody is
        // eligible for the residual, so it lands in the deepest real pot.
        let room = room_with(&[
            ("folder", 0, 100, PlayerStatus::Folded),
            ("p2", 1, 60, PlayerStatus::AllIn),
            ("p3", 2, 80, PlayerStatus::AllIn),
        ]);
        let pots = build_pots(&room);
        let total: Chips = pots.iter().map(|p| p.amount).sum();
        assert_eq!(total, 240);
        assert_eq!(pots.last().unwrap().eligible_players, vec!["p3"]);
    }

    #[test]
    fn eligibles_shrink_monotonically() {
        let room = room_with(&[
            ("p1", 0, 25, PlayerStatus::AllIn),
            ("p2", 1, 75, PlayerStatus::AllIn),
            ("p3", 2, 150, PlayerStatus::AllIn),
            ("p4", 3, 150, PlayerStatus::Active),
        ]);
        let pots = build_pots(&room);
        assert_eq!(pots.len(), 3);
        assert_eq!(
            pots.iter().map(|p| p.amount).collect::<Vec<_>>(),
            vec![100, 150, 150]
        );
        for pair in pots.windows(2) {
            for id in &pair[1].eligible_players {
                assert!(pair[0].eligible_players.contains(id));
            }
        }
    }

    #[test]
    fn order_from_dealer_starts_left_of_button() {
        let room = room_with(&[
            ("a", 1, 10, PlayerStatus::Active),
            ("b", 4, 10, PlayerStatus::Active),
            ("c", 8, 10, PlayerStatus::Active),
        ]);
        let ids: Vec<PlayerId> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(order_from_dealer(&room, &ids, 4), vec!["c", "a", "b"]);
        // Wrapping: dealer in the last seat puts the lowest seat first.
        assert_eq!(order_from_dealer(&room, &ids, 11), vec!["a", "b", "c"]);
    }
}
