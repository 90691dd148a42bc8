//! Core game logic: data model, pure state transitions, and pot math.
//!
//! Everything in this module is synchronous and free of I/O. The room actor
//! owns a snapshot and applies the functions in [`engine`] to a clone of it,
//! so a failed transition never leaks partial state.

pub mod constants;
pub mod engine;
pub mod entities;
pub mod errors;
pub mod events;
pub mod pot;

pub use constants::SEATS;
pub use entities::{
    Chips, HandPhase, HandState, Player, PlayerAction, PlayerId, PlayerStatus, Pot, Room, RoomId,
    RoomStatus, SettlementProposal,
};
pub use errors::GameError;
pub use events::{GameEvent, Settlement, Standing};
