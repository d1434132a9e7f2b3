//! Hi-lo equation poker engine.
//!
//! This module provides:
//! - Cards, the deck and per-hand player state
//! - The room phase machine with its dealing and betting rounds
//! - Hi-lo resolution and per-recipient card redaction

pub mod betting;
pub mod constants;
pub mod dealing;
pub mod entities;
pub mod errors;
pub mod functional;
pub mod resolver;
pub mod state_machine;
pub mod visibility;

pub use errors::{DeckError, EngineError};
pub use state_machine::Room;
