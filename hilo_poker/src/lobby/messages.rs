//! Lobby actor message types.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::{
    game::entities::RoomCode,
    net::{messages::ServerMessage, outbox::DeadlineStage},
};

/// Identifies one socket for as long as it stays open.
pub type ConnectionId = Uuid;

/// Messages that can be sent to the LobbyActor
#[derive(Debug)]
pub enum LobbyMessage {
    /// A socket opened. Frames for it go to `sender`.
    Connect {
        connection_id: ConnectionId,
        sender: mpsc::Sender<ServerMessage>,
    },

    /// A socket closed. The player it was bound to stays seated.
    Disconnect { connection_id: ConnectionId },

    /// One raw text frame from a socket
    Inbound {
        connection_id: ConnectionId,
        text: String,
    },

    /// A room's equation timer fired
    EquationDeadline {
        room_code: RoomCode,
        hand_number: u32,
        stage: DeadlineStage,
    },

    /// Get lobby counters
    GetStats {
        response: oneshot::Sender<LobbyStats>,
    },
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct LobbyStats {
    pub rooms: usize,
    pub players: usize,
    pub connections: usize,
}
