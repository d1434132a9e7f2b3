//! Wire protocol between room clients and the lobby.

/// Client and server message types.
pub mod messages;

/// Deliveries and timer commands produced by the engine.
pub mod outbox;
