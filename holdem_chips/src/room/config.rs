//! Room configuration models.

use serde::{Deserialize, Serialize};

use crate::game::constants::{DEFAULT_HAND_INTERVAL_SECS, SEATS};
use crate::game::entities::{Chips, Player, PlayerId, PlayerStatus, Room, RoomId, RoomStatus};
use crate::game::errors::GameError;

/// Parameters a room is created with. Everything else about a room derives
/// from play.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RoomConfig {
    /// Small blind; the big blind is always twice this.
    pub sb_amount: Chips,
    /// Buy-in stack; also the quantum for rebuys and cashouts.
    pub initial_chips: Chips,
    /// 0 means a player may rebuy only at zero chips; otherwise rebuy is
    /// allowed while at or below this stack.
    pub rebuy_minimum: Chips,
    /// 0 means unlimited; otherwise stacks above this must cash out before
    /// readying up.
    pub max_chips: Chips,
    /// Seconds between hands, stored for client pacing.
    pub hand_interval: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            sb_amount: 10,
            initial_chips: 1000,
            rebuy_minimum: 0,
            max_chips: 0,
            hand_interval: DEFAULT_HAND_INTERVAL_SECS,
        }
    }
}

impl RoomConfig {
    pub fn bb_amount(&self) -> Chips {
        self.sb_amount * 2
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.sb_amount <= 0 {
            return Err(GameError::Validation(
                "small blind must be positive".to_string(),
            ));
        }
        if self.initial_chips < 2 * self.bb_amount() {
            return Err(GameError::Validation(
                "initial chips must cover at least two big blinds".to_string(),
            ));
        }
        if self.rebuy_minimum < 0 {
            return Err(GameError::Validation(
                "rebuy minimum cannot be negative".to_string(),
            ));
        }
        if self.max_chips != 0 && self.max_chips <= self.initial_chips {
            return Err(GameError::Validation(
                "max chips must be zero or greater than the initial stack".to_string(),
            ));
        }
        Ok(())
    }

    /// Build a fresh room with the owner bought in and seated at seat 0.
    /// `now` seeds the idle clock so an abandoned room is eventually swept.
    pub fn new_room(
        &self,
        id: RoomId,
        owner_id: PlayerId,
        owner_name: &str,
        owner_emoji: &str,
        now: i64,
    ) -> Room {
        let mut owner = Player::new(&owner_id, owner_name, owner_emoji, self.initial_chips);
        owner.seat = 0;
        owner.status = PlayerStatus::Active;
        let mut seats = vec![None; SEATS];
        seats[0] = Some(owner_id.clone());
        let mut players = std::collections::BTreeMap::new();
        players.insert(owner_id.clone(), owner);
        Room {
            id,
            status: RoomStatus::Waiting,
            owner_id,
            sb_amount: self.sb_amount,
            bb_amount: self.bb_amount(),
            initial_chips: self.initial_chips,
            rebuy_minimum: self.rebuy_minimum,
            max_chips: self.max_chips,
            hand_interval: self.hand_interval,
            players,
            seats,
            hand: None,
            hand_number: 0,
            last_dealer_seat: -1,
            last_all_disconnected_at: Some(now),
        }
    }
}
