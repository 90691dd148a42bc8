//! Game-wide constants.

/// Number of physical seats at a table.
pub const SEATS: usize = 12;

/// Minimum number of seated, ready players required to start a hand.
pub const MIN_PLAYERS: usize = 2;

/// Default pause between hands, in seconds. Clients use this to pace the
/// between-hand countdown; the server only stores it.
pub const DEFAULT_HAND_INTERVAL_SECS: u64 = 5;
