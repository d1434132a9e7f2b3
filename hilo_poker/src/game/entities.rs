use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::VecDeque, fmt};

use super::{
    constants::{DRAWN_OPERATOR_COPIES, MAX_RANK, MAX_USERNAME_LENGTH},
    errors::DeckError,
};

/// Placeholder for numbered card values (0..=10).
pub type Rank = u8;

/// Type alias for whole chips. Bets, stakes and pots are never fractional.
pub type Chips = u32;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Stone,
    Bronze,
    Silver,
    Gold,
    // Operator cards carry no numbered suit.
    Operator,
}

impl Suit {
    pub const NUMBERED: [Suit; 4] = [Suit::Stone, Suit::Bronze, Suit::Silver, Suit::Gold];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Stone => "stone",
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Operator => "op",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "−")]
    Subtract,
    #[serde(rename = "÷")]
    Divide,
    #[serde(rename = "×")]
    Multiply,
    #[serde(rename = "√")]
    Root,
}

impl Operator {
    /// Operators every player holds each hand without drawing them.
    pub const GRANTED: [Operator; 3] = [Operator::Add, Operator::Divide, Operator::Subtract];
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Add => "+",
            Self::Subtract => "−",
            Self::Divide => "÷",
            Self::Multiply => "×",
            Self::Root => "√",
        };
        write!(f, "{repr}")
    }
}

/// What a card shows: a number or an operator, never both.
///
/// On the wire a number is a bare integer and an operator is its symbol,
/// which is also how clients name the card they want to discard.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CardValue {
    Number(Rank),
    Operator(Operator),
}

impl fmt::Display for CardValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Number(rank) => write!(f, "{rank}"),
            Self::Operator(op) => write!(f, "{op}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Card {
    pub value: CardValue,
    pub suit: Suit,
    pub hidden: bool,
}

impl Card {
    pub fn number(rank: Rank, suit: Suit) -> Self {
        Self {
            value: CardValue::Number(rank),
            suit,
            hidden: false,
        }
    }

    pub fn operator(op: Operator) -> Self {
        Self {
            value: CardValue::Operator(op),
            suit: Suit::Operator,
            hidden: false,
        }
    }

    pub fn rank(&self) -> Option<Rank> {
        match self.value {
            CardValue::Number(rank) => Some(rank),
            CardValue::Operator(_) => None,
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self.value, CardValue::Operator(_))
    }

    pub fn is(&self, op: Operator) -> bool {
        self.value == CardValue::Operator(op)
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.value {
            CardValue::Number(rank) => write!(f, "{rank}/{}", self.suit),
            CardValue::Operator(op) => write!(f, "{op}"),
        }
    }
}

/// An ordered pile drawn from the front.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: VecDeque<Card>,
}

impl Deck {
    /// A deck in exactly the given order, front first.
    pub fn from_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        Self {
            cards: cards.into_iter().collect(),
        }
    }

    pub fn shuffled() -> Self {
        let mut deck = Self::default();
        deck.shuffle(&mut rand::rng());
        deck
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.make_contiguous().shuffle(rng);
    }

    /// Removes the front card whatever it is.
    pub fn draw_any(&mut self) -> Result<Card, DeckError> {
        self.cards.pop_front().ok_or(DeckError::Exhausted)
    }

    /// Removes the first numbered card, leaving the order of everything
    /// else untouched.
    pub fn draw_number(&mut self) -> Result<Card, DeckError> {
        let idx = self
            .cards
            .iter()
            .position(|card| !card.is_operator())
            .ok_or(DeckError::NoNumberedCards)?;
        self.cards.remove(idx).ok_or(DeckError::NoNumberedCards)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = VecDeque::new();
        for _ in 0..DRAWN_OPERATOR_COPIES {
            cards.push_back(Card::operator(Operator::Multiply));
            cards.push_back(Card::operator(Operator::Root));
        }
        for rank in 0..=MAX_RANK {
            for suit in Suit::NUMBERED {
                cards.push_back(Card::number(rank, suit));
            }
        }
        Self { cards }
    }
}

/// Client-generated player identity, stable across reconnects.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Room codes are case-insensitive and stored upper-cased.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn new(s: &str) -> Self {
        Self(s.to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for RoomCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(s.trim()))
    }
}

impl From<&str> for RoomCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Display name with all whitespace removed.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Username(String);

impl Username {
    pub fn new(s: &str) -> Self {
        let username: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .take(MAX_USERNAME_LENGTH)
            .collect();
        Self(username)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Low,
    High,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Low => "low",
            Self::High => "high",
        };
        write!(f, "{repr}")
    }
}

/// Which targets a player contests. Both set means a swing bet.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Choices {
    pub low: bool,
    pub high: bool,
}

impl Choices {
    pub fn is_empty(&self) -> bool {
        !self.low && !self.high
    }

    pub fn is_swing(&self) -> bool {
        self.low && self.high
    }

    pub fn to_vec(self) -> Vec<Choice> {
        let mut choices = Vec::with_capacity(2);
        if self.low {
            choices.push(Choice::Low);
        }
        if self.high {
            choices.push(Choice::High);
        }
        choices
    }
}

impl<'a> FromIterator<&'a Choice> for Choices {
    fn from_iter<I: IntoIterator<Item = &'a Choice>>(iter: I) -> Self {
        let mut choices = Self::default();
        for choice in iter {
            match choice {
                Choice::Low => choices.low = true,
                Choice::High => choices.high = true,
            }
        }
        choices
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub username: Option<Username>,
    pub room_code: RoomCode,
    pub color: String,
    /// Left-to-right order is the order of the player's equation.
    pub hand: Vec<Card>,
    pub chip_count: Chips,
    /// Committed during the current betting round.
    pub stake: Chips,
    /// Committed during the current hand, across both rounds.
    pub contribution: Chips,
    pub folded: bool,
    pub turn_taken: bool,
    pub equation_result: Option<f64>,
    pub equation_order: Vec<usize>,
    /// Second arrangement submitted by swing bettors.
    pub other_hand: Vec<Card>,
    pub other_equation_result: Option<f64>,
    pub low_equation_result: Option<f64>,
    pub high_equation_result: Option<f64>,
    pub low_hand: Vec<Card>,
    pub high_hand: Vec<Card>,
    pub choices: Choices,
    pub is_lo_contender: bool,
    pub is_hi_contender: bool,
    pub acknowledged_results: bool,
    pub needs_to_discard: bool,
    /// Eliminated or departed; auto-folds every later hand.
    pub out: bool,
    /// Left the room. Eliminated players stay seated and still acknowledge
    /// results; departed ones are not waited on.
    pub departed: bool,
}

impl Player {
    pub fn new(id: PlayerId, room_code: RoomCode, color: String, chip_count: Chips) -> Self {
        Self {
            id,
            username: None,
            room_code,
            color,
            hand: Vec::new(),
            chip_count,
            stake: 0,
            contribution: 0,
            folded: false,
            turn_taken: false,
            equation_result: None,
            equation_order: Vec::new(),
            other_hand: Vec::new(),
            other_equation_result: None,
            low_equation_result: None,
            high_equation_result: None,
            low_hand: Vec::new(),
            high_hand: Vec::new(),
            choices: Choices::default(),
            is_lo_contender: false,
            is_hi_contender: false,
            acknowledged_results: false,
            needs_to_discard: false,
            out: false,
            departed: false,
        }
    }

    /// Clears everything scoped to a single hand. Chips, identity and the
    /// eliminated flag survive.
    pub fn reset_for_hand(&mut self) {
        self.hand.clear();
        self.stake = 0;
        self.contribution = 0;
        self.folded = false;
        self.turn_taken = false;
        self.equation_result = None;
        self.equation_order.clear();
        self.other_hand.clear();
        self.other_equation_result = None;
        self.low_equation_result = None;
        self.high_equation_result = None;
        self.low_hand.clear();
        self.high_hand.clear();
        self.choices = Choices::default();
        self.is_lo_contender = false;
        self.is_hi_contender = false;
        self.acknowledged_results = false;
        self.needs_to_discard = false;
    }

    pub fn display_name(&self) -> String {
        match &self.username {
            Some(username) => username.to_string(),
            None => self.id.to_string(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.folded
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GamePhase {
    Lobby,
    FirstDeal,
    FirstBetting,
    SecondDeal,
    EquationForming,
    SecondBetting,
    HiLoSelection,
    ResultViewing,
}

impl GamePhase {
    pub fn is_betting(&self) -> bool {
        matches!(self, Self::FirstBetting | Self::SecondBetting)
    }

    pub fn is_dealing(&self) -> bool {
        matches!(self, Self::FirstDeal | Self::SecondDeal)
    }

    pub fn allows_fold(&self) -> bool {
        matches!(
            self,
            Self::FirstBetting | Self::SecondBetting | Self::EquationForming
        )
    }

    pub fn hand_in_progress(&self) -> bool {
        !matches!(self, Self::Lobby)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Lobby => "lobby",
            Self::FirstDeal => "first-deal",
            Self::FirstBetting => "first-betting",
            Self::SecondDeal => "second-deal",
            Self::EquationForming => "equation-forming",
            Self::SecondBetting => "second-betting",
            Self::HiLoSelection => "hi-lo-selection",
            Self::ResultViewing => "result-viewing",
        };
        write!(f, "{repr}")
    }
}

/// Authoritative state of one room.
#[derive(Clone, Debug)]
pub struct Game {
    pub room_code: RoomCode,
    pub host_id: PlayerId,
    pub current_turn: PlayerId,
    pub phase: GamePhase,
    pub pot: Chips,
    /// Highest stake posted by any active player this betting round.
    pub to_call: Chips,
    pub deck: Deck,
    pub hand_number: u32,
    pub max_raise_reached: bool,
    /// The equation window expired and only late answers are awaited.
    pub equation_window_closed: bool,
    pub created_at: DateTime<Utc>,
}

impl Game {
    pub fn new(room_code: RoomCode, host_id: PlayerId) -> Self {
        Self {
            room_code,
            current_turn: host_id.clone(),
            host_id,
            phase: GamePhase::Lobby,
            pot: 0,
            to_call: 0,
            deck: Deck::from_cards([]),
            hand_number: 0,
            max_raise_reached: false,
            equation_window_closed: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.created_at > ttl
    }
}
