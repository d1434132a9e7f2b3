//! # Hi-Lo Poker
//!
//! Engine for hi-lo equation poker: every player is dealt numbers and
//! operators, bets over two rounds, then arranges their cards into an
//! equation aimed at a low target, a high target, or both.
//!
//! A room moves through these phases:
//!
//! - **Lobby**: Waiting for the host to start
//! - **FirstDeal**: Granted operators, one hidden number, two open cards
//! - **FirstBetting**: Ante round
//! - **SecondDeal**: One more open card
//! - **EquationForming**: Timed window to submit an equation
//! - **SecondBetting**: Skipped once someone is all-in
//! - **HiLoSelection**: Choose low, high or both
//! - **ResultViewing**: Pot awarded, waiting for acknowledgements
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, the phase machine, betting and resolution
//! - [`lobby`]: Room registry, message handlers and the lobby actor
//! - [`net`]: JSON wire protocol and handler effects
//!
//! ## Example
//!
//! ```
//! use hilo_poker::{ServerContext, GameConfig, net::outbox::Outbox};
//!
//! let mut context = ServerContext::new(GameConfig::default());
//! let mut out = Outbox::new();
//! context
//!     .handle_raw(None, r#"{"type":"create","userId":"alice"}"#, &mut out)
//!     .unwrap();
//! assert_eq!(context.games.len(), 1);
//! ```

/// Core game logic, entities, and state machine.
pub mod game;

/// Rooms, connections and the actor that serializes access to them.
pub mod lobby;

/// Wire protocol.
pub mod net;

pub use game::{
    EngineError, Room,
    constants,
    entities::{self, Card, Chips, GamePhase, PlayerId, RoomCode},
};
pub use lobby::{GameConfig, LobbyActor, LobbyHandle, ServerContext};
pub use net::{messages, outbox};
