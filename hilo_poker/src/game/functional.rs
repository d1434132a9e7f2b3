use super::entities::{Card, Rank, Suit};

/// Next entry after the one identified by `key`, scanning forward and
/// wrapping around once. The keyed entry itself is never returned. When
/// `key` is absent, every entry is considered from the start.
pub fn find_next_with_wrap<'a, T, K, F, P>(
    items: &'a [T],
    key: &K,
    key_of: F,
    mut pred: P,
) -> Option<&'a T>
where
    K: PartialEq + ?Sized,
    F: Fn(&T) -> &K,
    P: FnMut(&T) -> bool,
{
    let len = items.len();
    match items.iter().position(|item| key_of(item) == key) {
        Some(start) => (1..len)
            .map(|offset| &items[(start + offset) % len])
            .find(|item| pred(item)),
        None => items.iter().find(|item| pred(item)),
    }
}

fn numbered(hand: &[Card]) -> impl Iterator<Item = (Rank, Suit, &Card)> {
    hand.iter()
        .filter_map(|card| card.rank().map(|rank| (rank, card.suit, card)))
}

/// Lowest numbered card by rank, ties going to the lower suit.
pub fn lowest_card(hand: &[Card]) -> Option<Card> {
    numbered(hand)
        .min_by_key(|(rank, suit, _)| (*rank, *suit))
        .map(|(_, _, card)| *card)
}

/// Highest numbered card by rank, ties going to the higher suit.
pub fn highest_card(hand: &[Card]) -> Option<Card> {
    numbered(hand)
        .max_by_key(|(rank, suit, _)| (*rank, *suit))
        .map(|(_, _, card)| *card)
}

/// True when `order` lists every index below `len` exactly once.
pub fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &idx in order {
        match seen.get_mut(idx) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

/// Rearranges `hand` so position `i` holds the card previously at `order[i]`.
/// Callers check `order` with [`is_permutation`] first.
pub fn reorder(hand: &[Card], order: &[usize]) -> Vec<Card> {
    order.iter().filter_map(|&idx| hand.get(idx).copied()).collect()
}
