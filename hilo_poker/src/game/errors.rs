//! Engine error types.
//!
//! Wrong-phase and out-of-turn messages are not errors: they are ignored.
//! These variants cover lookups and draws that should never fail, and abort
//! the handler that hit them.

use thiserror::Error;

use super::entities::{PlayerId, RoomCode};

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum DeckError {
    #[error("deck exhausted")]
    Exhausted,
    #[error("no numbered cards left in the deck")]
    NoNumberedCards,
}

#[derive(Debug, Eq, Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error("room {0} does not exist")]
    RoomNotFound(RoomCode),
    #[error("player {0} does not exist")]
    PlayerNotFound(PlayerId),
    #[error("room {0} has no active player to hand the turn to")]
    NoEligiblePlayer(RoomCode),
}

pub type Result<T> = std::result::Result<T, EngineError>;
