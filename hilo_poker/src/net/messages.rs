//! JSON message protocol spoken over the room connection.
//!
//! Every message is an object with a kebab-case `type` tag and camelCase
//! fields, e.g. `{"type": "bet-placed", "userId": "…", "betAmount": 2}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::{
    entities::{CardValue, Chips, Choice, GamePhase, PlayerId, RoomCode, Username},
    visibility::CardView,
};

/// A message from a client to the server.
///
/// `user_id` is the player the client claims to act for. Only `create`,
/// `enter` and `refresh` may establish who a connection is; every other
/// message acts for the identity bound to the connection.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Create {
        user_id: PlayerId,
        #[serde(default)]
        color: Option<String>,
    },
    Enter {
        user_id: PlayerId,
        room_code: RoomCode,
        #[serde(default)]
        color: Option<String>,
    },
    Join {
        #[serde(default)]
        user_id: Option<PlayerId>,
        username: Username,
        #[serde(default)]
        color: Option<String>,
    },
    Start {
        #[serde(default)]
        user_id: Option<PlayerId>,
    },
    Leave {
        #[serde(default)]
        user_id: Option<PlayerId>,
    },
    Discard {
        #[serde(default)]
        user_id: Option<PlayerId>,
        value: CardValue,
    },
    BetPlaced {
        #[serde(default)]
        user_id: Option<PlayerId>,
        bet_amount: Chips,
    },
    Fold {
        #[serde(default)]
        user_id: Option<PlayerId>,
        /// Folded by the player rather than by the client giving up on an
        /// equation it could not form.
        #[serde(default)]
        manual: bool,
    },
    EquationResult {
        #[serde(default)]
        user_id: Option<PlayerId>,
        result: f64,
        order: Vec<usize>,
    },
    HiLoSelected {
        #[serde(default)]
        user_id: Option<PlayerId>,
        choices: Vec<Choice>,
        #[serde(default)]
        other_equation_result: Option<f64>,
        #[serde(default)]
        order: Option<Vec<usize>>,
    },
    AcknowledgeHandResults {
        #[serde(default)]
        user_id: Option<PlayerId>,
    },
    Refresh {
        user_id: PlayerId,
    },
}

impl ClientMessage {
    /// Wire names of every message type the server understands.
    pub const KINDS: [&'static str; 12] = [
        "create",
        "enter",
        "join",
        "start",
        "leave",
        "discard",
        "bet-placed",
        "fold",
        "equation-result",
        "hi-lo-selected",
        "acknowledge-hand-results",
        "refresh",
    ];

    /// The actor id the client declared, if any.
    pub fn declared_user(&self) -> Option<&PlayerId> {
        match self {
            Self::Create { user_id, .. }
            | Self::Enter { user_id, .. }
            | Self::Refresh { user_id } => Some(user_id),
            Self::Join { user_id, .. }
            | Self::Start { user_id }
            | Self::Leave { user_id }
            | Self::Discard { user_id, .. }
            | Self::BetPlaced { user_id, .. }
            | Self::Fold { user_id, .. }
            | Self::EquationResult { user_id, .. }
            | Self::HiLoSelected { user_id, .. }
            | Self::AcknowledgeHandResults { user_id } => user_id.as_ref(),
        }
    }
}

/// Result of reading one raw inbound frame.
#[derive(Debug, PartialEq)]
pub enum Inbound {
    Message(ClientMessage),
    /// Well-formed envelope with a type nobody handles.
    Unknown(String),
    /// Not JSON, no type tag, or fields that don't fit the type.
    Malformed,
}

pub fn parse_inbound(text: &str) -> Inbound {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return Inbound::Malformed;
    };
    let kind = match value.get("type").and_then(Value::as_str) {
        Some(kind) => kind.to_string(),
        None => return Inbound::Malformed,
    };
    if !ClientMessage::KINDS.contains(&kind.as_str()) {
        return Inbound::Unknown(kind);
    }
    match serde_json::from_value(value) {
        Ok(message) => Inbound::Message(message),
        Err(_) => Inbound::Malformed,
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    Check,
    Ante,
    Call,
    Raise,
    Raise10,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinRejectReason {
    NotFound,
    RoomFull,
    InProgress,
    InOtherRoom,
    /// Another live connection already acts for this player.
    AlreadyConnected,
}

/// One player's line in the hand summary.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub id: PlayerId,
    pub username: Option<Username>,
    pub chip_count: Chips,
    pub chip_differential: Chips,
    pub low_hand: Vec<CardView>,
    pub high_hand: Vec<CardView>,
    pub folded: bool,
    pub low_card: Option<CardView>,
    pub high_card: Option<CardView>,
    pub choices: Vec<Choice>,
    pub low_result: Option<f64>,
    pub high_result: Option<f64>,
    pub low_difference: Option<f64>,
    pub high_difference: Option<f64>,
    pub is_lo_winner: bool,
    pub is_hi_winner: bool,
    pub lo_winner_low_card: Option<CardView>,
    pub hi_winner_high_card: Option<CardView>,
    pub is_lo_contender: bool,
    pub is_hi_contender: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub message: String,
    #[serde(default)]
    pub lo_winner: Option<PlayerId>,
    #[serde(default)]
    pub hi_winner: Option<PlayerId>,
    #[serde(default)]
    pub results: Vec<ResultRow>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub because_all_but_one_folded: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub because_no_one_formed_equation: bool,
}

/// A message from the server to one client.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// First frame on every connection: a suggested identity and color.
    Init { id: PlayerId, color: String },
    RoomEntered {
        room_code: RoomCode,
        host_id: PlayerId,
        joined: bool,
        in_progress: bool,
    },
    RoomJoinReject { reason: JoinRejectReason },
    SuggestRoom { room_code: RoomCode },
    PlayerJoined {
        id: PlayerId,
        host_id: PlayerId,
        color: String,
        username: Option<Username>,
    },
    /// `host_id` is the host after the departure, which may have moved.
    PlayerLeft { id: PlayerId, host_id: PlayerId },
    GameStarted,
    RejectStart,
    BeginHand { hand_number: u32 },
    Deal {
        id: PlayerId,
        username: Option<Username>,
        chip_count: Chips,
        multiplication_card_dealt: bool,
        hand: Vec<CardView>,
    },
    PlayerDiscarded {
        id: PlayerId,
        username: Option<Username>,
        value: CardValue,
    },
    FirstRoundBettingCommenced,
    NextTurn {
        to_call: Chips,
        max_bet: Chips,
        current_turn_player_id: PlayerId,
        username: Option<Username>,
        player_chip_count: Chips,
    },
    BetPlaced {
        id: PlayerId,
        username: Option<Username>,
        bet_amount: Chips,
        chip_count: Chips,
        pot: Chips,
        bet_type: BetType,
    },
    EndBettingRound { round: GamePhase },
    PlayerFolded {
        id: PlayerId,
        username: Option<Username>,
        hand: Vec<CardView>,
    },
    CommenceEquationForming {
        /// Whether the recipient sits this phase out.
        folded: bool,
        deadline_secs: u64,
    },
    PlayerFormedEquation {
        id: PlayerId,
        username: Option<Username>,
        chip_count: Chips,
        hand: Vec<CardView>,
    },
    EndEquationForming,
    RequestFormedEquation,
    SecondRoundBettingCommenced,
    SecondRoundBettingSkipped,
    HiLoSelection,
    RoundResult(RoundResult),
    ChipDistribution { id: PlayerId, chip_count: Chips },
    Kicked {
        user_id: PlayerId,
        username: Option<Username>,
    },
    GameOver {
        winner_id: Option<PlayerId>,
        username: Option<Username>,
    },
    UnknownMessage,
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::RoomEntered { .. } => "room-entered",
            Self::RoomJoinReject { .. } => "room-join-reject",
            Self::SuggestRoom { .. } => "suggest-room",
            Self::PlayerJoined { .. } => "player-joined",
            Self::PlayerLeft { .. } => "player-left",
            Self::GameStarted => "game-started",
            Self::RejectStart => "reject-start",
            Self::BeginHand { .. } => "begin-hand",
            Self::Deal { .. } => "deal",
            Self::PlayerDiscarded { .. } => "player-discarded",
            Self::FirstRoundBettingCommenced => "first-round-betting-commenced",
            Self::NextTurn { .. } => "next-turn",
            Self::BetPlaced { .. } => "bet-placed",
            Self::EndBettingRound { .. } => "end-betting-round",
            Self::PlayerFolded { .. } => "player-folded",
            Self::CommenceEquationForming { .. } => "commence-equation-forming",
            Self::PlayerFormedEquation { .. } => "player-formed-equation",
            Self::EndEquationForming => "end-equation-forming",
            Self::RequestFormedEquation => "request-formed-equation",
            Self::SecondRoundBettingCommenced => "second-round-betting-commenced",
            Self::SecondRoundBettingSkipped => "second-round-betting-skipped",
            Self::HiLoSelection => "hi-lo-selection",
            Self::RoundResult(_) => "round-result",
            Self::ChipDistribution { .. } => "chip-distribution",
            Self::Kicked { .. } => "kicked",
            Self::GameOver { .. } => "game-over",
            Self::UnknownMessage => "unknown-message",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
