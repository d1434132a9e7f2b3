/// Property-based tests for hand redaction, the deck and the resolver
/// using proptest
use hilo_poker::{
    entities::{Card, Choice, Deck, Operator, PlayerId, Suit},
    game::{
        functional::{find_next_with_wrap, highest_card, is_permutation, lowest_card, reorder},
        resolver::{Contestant, Targets, resolve},
        visibility::view_hand,
    },
};
use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};

fn suit_strategy() -> impl Strategy<Value = Suit> {
    prop_oneof![
        Just(Suit::Stone),
        Just(Suit::Bronze),
        Just(Suit::Silver),
        Just(Suit::Gold),
    ]
}

fn number_strategy() -> impl Strategy<Value = Card> {
    (0u8..=10, suit_strategy()).prop_map(|(rank, suit)| Card::number(rank, suit))
}

fn operator_strategy() -> impl Strategy<Value = Card> {
    prop_oneof![
        Just(Card::operator(Operator::Add)),
        Just(Card::operator(Operator::Subtract)),
        Just(Card::operator(Operator::Divide)),
        Just(Card::operator(Operator::Multiply)),
        Just(Card::operator(Operator::Root)),
    ]
}

// A hand with exactly one hidden card at a random index
fn hand_with_hidden_strategy() -> impl Strategy<Value = (Vec<Card>, usize)> {
    prop::collection::vec(prop_oneof![number_strategy(), operator_strategy()], 1..=8)
        .prop_flat_map(|hand| {
            let len = hand.len();
            (Just(hand), 0..len)
        })
        .prop_map(|(mut hand, hidden)| {
            hand[hidden].hidden = true;
            (hand, hidden)
        })
}

fn pot_strategy() -> impl Strategy<Value = u32> {
    0u32..200
}

fn contestant_strategy(i: usize) -> impl Strategy<Value = Contestant> {
    (
        prop_oneof![
            Just(vec![Choice::Low]),
            Just(vec![Choice::High]),
            Just(vec![Choice::Low, Choice::High]),
        ],
        -50.0f64..50.0,
        -50.0f64..50.0,
        prop::collection::vec(number_strategy(), 1..5),
    )
        .prop_map(move |(choices, low, high, hand)| {
            let choices: hilo_poker::entities::Choices = choices.iter().collect();
            Contestant {
                id: PlayerId::new(&format!("p{i}")),
                choices,
                low_result: choices.low.then_some(low),
                high_result: choices.high.then_some(high),
                hand,
            }
        })
}

fn table_strategy() -> impl Strategy<Value = Vec<Contestant>> {
    (1usize..=6).prop_flat_map(|n| (0..n).map(contestant_strategy).collect::<Vec<_>>())
}

proptest! {
    #[test]
    fn test_only_owner_sees_hidden_card((hand, hidden) in hand_with_hidden_strategy()) {
        let owner = PlayerId::new("owner");
        let other = PlayerId::new("other");

        let own_view = view_hand(&hand, &owner, &owner);
        let other_view = view_hand(&hand, &owner, &other);

        prop_assert_eq!(own_view.len(), hand.len());
        prop_assert_eq!(own_view[hidden].value, Some(hand[hidden].value));
        prop_assert!(other_view[hidden].is_redacted());
        prop_assert!(other_view[hidden].hidden);

        for (i, card) in hand.iter().enumerate() {
            if i != hidden {
                prop_assert_eq!(other_view[i].value, Some(card.value));
                prop_assert_eq!(other_view[i].suit, Some(card.suit));
            }
        }
    }

    #[test]
    fn test_shuffled_deck_keeps_composition(seed in any::<u64>()) {
        let mut deck = Deck::default();
        deck.shuffle(&mut StdRng::seed_from_u64(seed));

        prop_assert_eq!(deck.len(), 52);
        prop_assert_eq!(deck.iter().filter(|c| c.is(Operator::Multiply)).count(), 4);
        prop_assert_eq!(deck.iter().filter(|c| c.is(Operator::Root)).count(), 4);
        prop_assert!(!deck.iter().any(|c| c.is(Operator::Add)));
    }

    #[test]
    fn test_draw_number_never_returns_operator(seed in any::<u64>(), draws in 1usize..=44) {
        let mut deck = Deck::default();
        deck.shuffle(&mut StdRng::seed_from_u64(seed));
        for _ in 0..draws {
            let card = deck.draw_number().unwrap();
            prop_assert!(!card.is_operator());
        }
        prop_assert_eq!(deck.len(), 52 - draws);
    }

    #[test]
    fn test_lowest_never_above_highest(hand in prop::collection::vec(number_strategy(), 1..8)) {
        let low = lowest_card(&hand).unwrap();
        let high = highest_card(&hand).unwrap();
        prop_assert!((low.rank(), low.suit) <= (high.rank(), high.suit));
    }

    #[test]
    fn test_reorder_is_a_permutation(
        hand in prop::collection::vec(number_strategy(), 1..8),
        seed in any::<u64>(),
    ) {
        use rand::seq::SliceRandom;
        let mut order: Vec<usize> = (0..hand.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        prop_assert!(is_permutation(&order, hand.len()));
        let reordered = reorder(&hand, &order);
        prop_assert_eq!(reordered.len(), hand.len());
        for (slot, &from) in order.iter().enumerate() {
            prop_assert_eq!(reordered[slot], hand[from]);
        }
    }

    #[test]
    fn test_next_with_wrap_never_returns_start(len in 1usize..10, start in 0usize..10) {
        let items: Vec<usize> = (0..len).collect();
        let next = find_next_with_wrap(&items, &start, |i| i, |_| true);
        if len == 1 || start >= len {
            prop_assert_eq!(next.copied(), if start >= len { Some(0) } else { None });
        } else {
            prop_assert_eq!(next.copied(), Some((start + 1) % len));
        }
    }

    #[test]
    fn test_payouts_never_exceed_pot(table in table_strategy(), pot in pot_strategy()) {
        let resolution = resolve(&table, pot, Targets { low: 1.0, high: 20.0 });
        let paid: u32 = resolution.payouts.iter().map(|(_, amount)| amount).sum();

        prop_assert!(resolution.has_winner());
        prop_assert_eq!(paid + resolution.discarded, pot);
        prop_assert!(resolution.discarded <= 1);
    }
}
