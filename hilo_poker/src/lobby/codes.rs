use rand::Rng;

use crate::game::{constants::ROOM_CODE_ALPHABET, entities::RoomCode};

/// Draws codes until one is not `taken`.
pub fn mint_room_code<R, F>(rng: &mut R, length: usize, taken: F) -> RoomCode
where
    R: Rng + ?Sized,
    F: Fn(&RoomCode) -> bool,
{
    loop {
        let code: String = (0..length)
            .map(|_| char::from(ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())]))
            .collect();
        let code = RoomCode::new(&code);
        if !taken(&code) {
            return code;
        }
    }
}

/// A bright pastel players are drawn in until they pick their own.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("hsl({}, 100%, 70%)", rng.random_range(0..360))
}
