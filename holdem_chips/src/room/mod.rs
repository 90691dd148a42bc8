//! Room concurrency layer: per-room actor, its message protocol, and the
//! process-wide registry of live rooms.

pub mod actor;
pub mod config;
pub mod messages;
pub mod registry;

pub use actor::{RoomActor, RoomHandle, RoomPolicy};
pub use config::RoomConfig;
pub use messages::{RoomCommand, RoomUpdate};
pub use registry::{RegistryConfig, RoomRegistry};
