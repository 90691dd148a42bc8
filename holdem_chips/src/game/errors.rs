//! Error taxonomy for engine transitions.
//!
//! Every variant maps onto one surfacing path: `NotFound` becomes an HTTP 404
//! or a 4001 socket close, `Validation` a 400 or an `error` frame, and the
//! rest are `error` frames delivered to the originating client only. Engine
//! errors never mutate room state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("room or player not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    IllegalAction(String),
    #[error("not your turn")]
    NotYourTurn,
    #[error("seat is taken")]
    SeatTaken,
    #[error("already seated")]
    AlreadySeated,
    #[error("room is full")]
    RoomFull,
    #[error("must rebuy before readying up")]
    MustRebuy,
    #[error("must cash out before readying up")]
    MustCashout,
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// Whether the failure is a client mistake (bad request, bad timing)
    /// rather than a server-side fault. Internal errors are retryable.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_short_and_lowercase() {
        let err = GameError::IllegalAction("cannot check while facing a bet".to_string());
        assert_eq!(err.to_string(), "cannot check while facing a bet");
        assert_eq!(GameError::NotYourTurn.to_string(), "not your turn");
    }

    #[test]
    fn internal_is_not_a_client_error() {
        assert!(!GameError::Internal("db down".to_string()).is_client_error());
        assert!(GameError::SeatTaken.is_client_error());
    }
}
