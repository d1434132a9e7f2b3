//! Lobby actor implementation with async message handling.
//!
//! One actor owns every room. Sockets talk to it through a [`LobbyHandle`],
//! so all state transitions are applied one message at a time.

use chrono::Utc;
use std::collections::HashMap;
use tokio::{
    sync::{mpsc, oneshot},
    task::AbortHandle,
    time::{Duration, interval},
};

use super::{
    codes::random_color,
    config::GameConfig,
    messages::{ConnectionId, LobbyMessage, LobbyStats},
    registry::ServerContext,
};
use crate::{
    game::{
        entities::{PlayerId, RoomCode},
        errors::Result,
    },
    net::{
        messages::{ClientMessage, Inbound, JoinRejectReason, ServerMessage, parse_inbound},
        outbox::{Command, DeadlineStage, Delivery, Outbox, Recipient},
    },
};

/// Lobby actor handle for sending messages
#[derive(Clone, Debug)]
pub struct LobbyHandle {
    sender: mpsc::Sender<LobbyMessage>,
}

impl LobbyHandle {
    pub fn new(sender: mpsc::Sender<LobbyMessage>) -> Self {
        Self { sender }
    }

    /// Send a message to the lobby
    pub async fn send(&self, message: LobbyMessage) -> std::result::Result<(), String> {
        self.sender
            .send(message)
            .await
            .map_err(|_| "Lobby is closed".to_string())
    }

    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> std::result::Result<(), String> {
        self.send(LobbyMessage::Connect {
            connection_id,
            sender,
        })
        .await
    }

    pub async fn inbound(&self, connection_id: ConnectionId, text: String) -> std::result::Result<(), String> {
        self.send(LobbyMessage::Inbound {
            connection_id,
            text,
        })
        .await
    }

    pub async fn disconnect(&self, connection_id: ConnectionId) -> std::result::Result<(), String> {
        self.send(LobbyMessage::Disconnect { connection_id }).await
    }

    pub async fn stats(&self) -> std::result::Result<LobbyStats, String> {
        let (response, receiver) = oneshot::channel();
        self.send(LobbyMessage::GetStats { response }).await?;
        receiver
            .await
            .map_err(|_| "Lobby dropped the stats request".to_string())
    }
}

struct Connection {
    /// Player this socket acts for, once it created, entered or refreshed.
    player: Option<PlayerId>,
    sender: mpsc::Sender<ServerMessage>,
}

pub struct LobbyActor {
    context: ServerContext,
    inbox: mpsc::Receiver<LobbyMessage>,
    /// Lets timer tasks post back without keeping the lobby alive.
    weak_sender: mpsc::WeakSender<LobbyMessage>,
    connections: HashMap<ConnectionId, Connection>,
    /// At most one pending equation deadline per room.
    deadlines: HashMap<RoomCode, AbortHandle>,
    sweep_interval: Duration,
}

impl LobbyActor {
    pub fn new(config: GameConfig, sweep_interval: Duration) -> (Self, LobbyHandle) {
        Self::with_context(ServerContext::new(config), sweep_interval)
    }

    pub fn with_context(context: ServerContext, sweep_interval: Duration) -> (Self, LobbyHandle) {
        let (sender, inbox) = mpsc::channel(1024);
        let actor = Self {
            context,
            inbox,
            weak_sender: sender.downgrade(),
            connections: HashMap::new(),
            deadlines: HashMap::new(),
            sweep_interval,
        };
        (actor, LobbyHandle::new(sender))
    }

    /// Run the lobby event loop until every handle is dropped.
    pub async fn run(mut self) {
        log::info!("Lobby starting");
        let mut sweep = interval(self.sweep_interval);

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    if let Err(e) = self.handle_message(message) {
                        log::error!("Lobby: error handling message: {e}");
                    }
                }

                _ = sweep.tick() => {
                    self.sweep();
                }
            }
        }

        for (_, deadline) in self.deadlines.drain() {
            deadline.abort();
        }
        log::info!("Lobby stopped");
    }

    fn handle_message(&mut self, message: LobbyMessage) -> Result<()> {
        match message {
            LobbyMessage::Connect {
                connection_id,
                sender,
            } => {
                let init = ServerMessage::Init {
                    id: PlayerId::random(),
                    color: random_color(&mut rand::rng()),
                };
                if sender.try_send(init).is_ok() {
                    self.connections.insert(
                        connection_id,
                        Connection {
                            player: None,
                            sender,
                        },
                    );
                    log::debug!("Connection {connection_id} opened");
                }
                Ok(())
            }

            LobbyMessage::Disconnect { connection_id } => {
                if let Some(connection) = self.connections.remove(&connection_id) {
                    log::debug!(
                        "Connection {} closed (player {:?})",
                        connection_id,
                        connection.player
                    );
                }
                Ok(())
            }

            LobbyMessage::Inbound {
                connection_id,
                text,
            } => {
                let Some(connection) = self.connections.get(&connection_id) else {
                    return Ok(());
                };
                let bound = connection.player.clone();
                let mut out = Outbox::new();
                let result = match parse_inbound(&text) {
                    Inbound::Message(message) if self.held_elsewhere(connection_id, &message) => {
                        log::warn!(
                            "Connection {connection_id} tried to claim {:?}, which is live elsewhere",
                            message.declared_user()
                        );
                        out.to_sender(ServerMessage::RoomJoinReject {
                            reason: JoinRejectReason::AlreadyConnected,
                        });
                        Ok(())
                    }
                    inbound => self.context.handle_inbound(bound.as_ref(), inbound, &mut out),
                };
                self.dispatch(Some(connection_id), out);
                result
            }

            LobbyMessage::EquationDeadline {
                room_code,
                hand_number,
                stage,
            } => {
                self.deadlines.remove(&room_code);
                let mut out = Outbox::new();
                let result = self
                    .context
                    .equation_deadline(&room_code, hand_number, stage, &mut out);
                self.dispatch(None, out);
                result
            }

            LobbyMessage::GetStats { response } => {
                let _ = response.send(LobbyStats {
                    rooms: self.context.games.len(),
                    players: self.context.players.len(),
                    connections: self.connections.len(),
                });
                Ok(())
            }
        }
    }

    /// Whether `message` would bind a player that another open connection
    /// already acts for.
    fn held_elsewhere(&self, connection_id: ConnectionId, message: &ClientMessage) -> bool {
        let (ClientMessage::Create { user_id, .. }
        | ClientMessage::Enter { user_id, .. }
        | ClientMessage::Refresh { user_id }) = message
        else {
            return false;
        };
        self.connections
            .iter()
            .any(|(id, connection)| *id != connection_id && connection.player.as_ref() == Some(user_id))
    }

    /// Applies a handler's effects: timer commands and bindings first, then
    /// deliveries in the order they were queued.
    fn dispatch(&mut self, origin: Option<ConnectionId>, out: Outbox) {
        let (deliveries, commands) = out.into_parts();

        for command in commands {
            match command {
                Command::Bind(player) => {
                    if let Some(origin) = origin
                        && let Some(connection) = self.connections.get_mut(&origin)
                    {
                        connection.player = Some(player);
                    }
                }
                Command::ArmDeadline {
                    room_code,
                    hand_number,
                    stage,
                    after,
                } => self.arm(room_code, hand_number, stage, after),
                Command::DisarmDeadline(room_code) => self.disarm(&room_code),
            }
        }

        let mut closed = Vec::new();
        for Delivery { to, message } in deliveries {
            for (connection_id, connection) in &self.connections {
                let addressed = match &to {
                    Recipient::Sender => origin == Some(*connection_id),
                    Recipient::Player(id) => connection.player.as_ref() == Some(id),
                };
                if !addressed {
                    continue;
                }
                match connection.sender.try_send(message.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        log::warn!("Connection {connection_id} is backed up, dropping {}", message.kind());
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*connection_id),
                }
            }
        }

        for connection_id in closed {
            log::debug!("Connection {connection_id} went away");
            self.connections.remove(&connection_id);
        }
    }

    fn arm(&mut self, room_code: RoomCode, hand_number: u32, stage: DeadlineStage, after: Duration) {
        self.disarm(&room_code);
        let weak_sender = self.weak_sender.clone();
        let code = room_code.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(sender) = weak_sender.upgrade() {
                let _ = sender
                    .send(LobbyMessage::EquationDeadline {
                        room_code: code,
                        hand_number,
                        stage,
                    })
                    .await;
            }
        });
        log::debug!("Room {room_code}: {stage:?} deadline in {after:?}");
        self.deadlines.insert(room_code, task.abort_handle());
    }

    fn disarm(&mut self, room_code: &RoomCode) {
        if let Some(deadline) = self.deadlines.remove(room_code) {
            deadline.abort();
        }
    }

    fn sweep(&mut self) {
        let removed = self.context.sweep(Utc::now());
        if removed.is_empty() {
            return;
        }
        for code in &removed {
            self.disarm(code);
        }
        let players = &self.context.players;
        for connection in self.connections.values_mut() {
            if connection
                .player
                .as_ref()
                .is_some_and(|id| !players.contains(id))
            {
                connection.player = None;
            }
        }
        log::info!("Swept {} expired room(s)", removed.len());
    }
}
