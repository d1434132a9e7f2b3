//! Per-recipient views of hands.
//!
//! A hidden card is visible only to the player holding it. Everyone else
//! receives a [`CardView`] with nothing but `hidden: true`.

use serde::{Deserialize, Serialize};

use super::entities::{Card, CardValue, PlayerId, Suit};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CardView {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<CardValue>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suit: Option<Suit>,
    pub hidden: bool,
}

impl CardView {
    pub fn redacted() -> Self {
        Self {
            value: None,
            suit: None,
            hidden: true,
        }
    }

    pub fn is_redacted(&self) -> bool {
        self.value.is_none() && self.suit.is_none()
    }
}

impl From<Card> for CardView {
    fn from(card: Card) -> Self {
        Self {
            value: Some(card.value),
            suit: Some(card.suit),
            hidden: card.hidden,
        }
    }
}

/// The hand as `recipient` is allowed to see it.
pub fn view_hand(hand: &[Card], owner: &PlayerId, recipient: &PlayerId) -> Vec<CardView> {
    let is_owner = owner == recipient;
    hand.iter()
        .map(|card| {
            if card.hidden && !is_owner {
                CardView::redacted()
            } else {
                CardView::from(*card)
            }
        })
        .collect()
}

/// Every card face up, for hands already revealed at showdown.
pub fn reveal_hand(hand: &[Card]) -> Vec<CardView> {
    hand.iter()
        .map(|card| {
            let mut view = CardView::from(*card);
            view.hidden = false;
            view
        })
        .collect()
}
