//! # Holdem Chips
//!
//! Real-time coordinator for in-person No-Limit Hold'em played with physical
//! cards and no physical chips. The library tracks stacks, blinds, betting
//! rounds, main/side pots, rebuys, cashouts, and multi-party settlement
//! consensus, and multiplexes many rooms under per-room actors that fan out
//! full state snapshots to subscribers.
//!
//! Cards never enter the picture: deals and winners happen at the physical
//! table, and the engine only ratifies what the players agree on.
//!
//! ## Core modules
//!
//! - [`game`]: data model and pure state transitions (the engine)
//! - [`room`]: per-room actor, message protocol, and the room registry
//! - [`db`]: snapshot store contract plus Postgres and in-memory backends

pub mod db;
pub mod game;
pub mod room;

pub use db::{Database, DatabaseConfig, MemorySnapshotStore, PgSnapshotStore, SnapshotStore};
pub use game::{
    Chips, GameError, GameEvent, HandPhase, HandState, Player, PlayerAction, PlayerId,
    PlayerStatus, Pot, Room, RoomId, RoomStatus, SEATS, Settlement, SettlementProposal, Standing,
};
pub use room::{
    RegistryConfig, RoomActor, RoomCommand, RoomConfig, RoomHandle, RoomPolicy, RoomRegistry,
    RoomUpdate,
};
