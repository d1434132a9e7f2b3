//! Room rules shared by every game the lobby hosts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::{
    constants::{
        DEFAULT_ANTE, DEFAULT_HIGH_TARGET, DEFAULT_LOW_TARGET, DEFAULT_ROOM_CODE_LENGTH,
        DEFAULT_STARTING_CHIPS,
    },
    entities::Chips,
    resolver::Targets,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Chips every player sits down with
    pub starting_chips: Chips,

    /// Required opening bet of the first betting round
    pub ante: Chips,

    pub low_target: f64,
    pub high_target: f64,

    /// Time allowed to form an equation
    pub equation_window_secs: u64,

    /// Extra time to answer `request-formed-equation` before being folded
    pub equation_grace_secs: u64,

    /// Rooms older than this are swept
    pub room_ttl_secs: u64,

    pub min_players: usize,

    /// Capped so one deck always covers a full hand
    pub max_players: usize,

    pub room_code_length: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_chips: DEFAULT_STARTING_CHIPS,
            ante: DEFAULT_ANTE,
            low_target: DEFAULT_LOW_TARGET,
            high_target: DEFAULT_HIGH_TARGET,
            equation_window_secs: 90,
            equation_grace_secs: 15,
            room_ttl_secs: 24 * 60 * 60,
            min_players: 2,
            max_players: 6,
            room_code_length: DEFAULT_ROOM_CODE_LENGTH,
        }
    }
}

impl GameConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.starting_chips == 0 {
            return Err("Starting chips must be positive".to_string());
        }

        if self.ante > self.starting_chips {
            return Err("Ante cannot exceed starting chips".to_string());
        }

        if !(self.low_target.is_finite() && self.high_target.is_finite())
            || self.low_target >= self.high_target
        {
            return Err("Low target must be finite and below the high target".to_string());
        }

        if self.equation_window_secs == 0 {
            return Err("Equation window must be at least one second".to_string());
        }

        if self.min_players < 2 || self.max_players < self.min_players {
            return Err("Players per room must be at least 2 and min <= max".to_string());
        }

        // Worst case a player draws seven numbered cards in one hand.
        if self.max_players > 6 {
            return Err("Max players must be at most 6 for a single deck".to_string());
        }

        if self.room_code_length < 3 {
            return Err("Room codes need at least 3 characters".to_string());
        }

        Ok(())
    }

    pub fn targets(&self) -> Targets {
        Targets {
            low: self.low_target,
            high: self.high_target,
        }
    }

    pub fn equation_window(&self) -> Duration {
        Duration::from_secs(self.equation_window_secs)
    }

    pub fn equation_grace(&self) -> Duration {
        Duration::from_secs(self.equation_grace_secs)
    }

    pub fn room_ttl(&self) -> chrono::Duration {
        i64::try_from(self.room_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}
