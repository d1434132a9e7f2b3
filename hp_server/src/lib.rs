//! WebSocket front end for hi/lo equation poker.
//!
//! The game itself lives in `hilo_poker`; this crate wires a [`LobbyActor`]
//! behind an axum router and adds per-socket housekeeping.
//!
//! [`LobbyActor`]: hilo_poker::LobbyActor

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
