use super::entities::{Chips, Rank};

/// Ranks run from zero to ten inclusive on every numbered suit.
pub const MAX_RANK: Rank = 10;

/// Copies of each drawable operator (multiply and root) shuffled into a deck.
pub const DRAWN_OPERATOR_COPIES: usize = 4;

/// Numbered cards plus the drawable operators.
pub const DECK_SIZE: usize = 4 * (MAX_RANK as usize + 1) + 2 * DRAWN_OPERATOR_COPIES;

pub const DEFAULT_STARTING_CHIPS: Chips = 25;
pub const DEFAULT_ANTE: Chips = 1;
pub const DEFAULT_LOW_TARGET: f64 = 1.0;
pub const DEFAULT_HIGH_TARGET: f64 = 20.0;

/// Raising by at least this much is announced as a big raise.
pub const BIG_RAISE: Chips = 10;

pub const MAX_USERNAME_LENGTH: usize = 16;

/// Room codes avoid vowels and look-alike glyphs (0/O, 1/I/L).
pub const ROOM_CODE_ALPHABET: &[u8] = b"BCDFGHJKMNPQRSTVWXYZ23456789";
pub const DEFAULT_ROOM_CODE_LENGTH: usize = 4;
