//! Room registry, inbound message handling and the lobby actor.
//!
//! ## Architecture
//!
//! A single `LobbyActor` runs in its own Tokio task with an mpsc inbox.
//! Sockets register with it through a `LobbyHandle`; each inbound frame is
//! handled against the registries and the resulting deliveries are fanned
//! out to the sockets bound to each recipient.
//!
//! ## Example
//!
//! ```ignore
//! use hilo_poker::lobby::{GameConfig, LobbyActor};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (actor, handle) = LobbyActor::new(GameConfig::default(), Duration::from_secs(300));
//!     tokio::spawn(actor.run());
//!
//!     // handle.connect(connection_id, sender).await;
//! }
//! ```

pub mod actor;
pub mod codes;
pub mod config;
pub mod handlers;
pub mod messages;
pub mod registry;

pub use actor::{LobbyActor, LobbyHandle};
pub use config::GameConfig;
pub use messages::{ConnectionId, LobbyMessage, LobbyStats};
pub use registry::{DeckSource, ServerContext};
