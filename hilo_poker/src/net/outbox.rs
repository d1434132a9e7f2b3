//! Effects produced by handling one inbound message.
//!
//! Handlers never touch connections or timers directly. They queue
//! deliveries (already filtered for their recipient) and timer commands,
//! and the lobby actor carries them out once the handler returns.

use std::time::Duration;

use super::messages::ServerMessage;
use crate::game::entities::{PlayerId, RoomCode};

#[derive(Clone, Debug, PartialEq)]
pub enum Recipient {
    /// Every connection bound to this player.
    Player(PlayerId),
    /// The connection that sent the message being handled.
    Sender,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub to: Recipient,
    pub message: ServerMessage,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DeadlineStage {
    /// The equation-forming window itself.
    Window,
    /// Extra time for answers to `request-formed-equation`.
    Grace,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Bind the sending connection to a player.
    Bind(PlayerId),
    ArmDeadline {
        room_code: RoomCode,
        hand_number: u32,
        stage: DeadlineStage,
        after: Duration,
    },
    DisarmDeadline(RoomCode),
}

#[derive(Debug, Default)]
pub struct Outbox {
    deliveries: Vec<Delivery>,
    commands: Vec<Command>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_player(&mut self, id: &PlayerId, message: ServerMessage) {
        self.deliveries.push(Delivery {
            to: Recipient::Player(id.clone()),
            message,
        });
    }

    pub fn to_sender(&mut self, message: ServerMessage) {
        self.deliveries.push(Delivery {
            to: Recipient::Sender,
            message,
        });
    }

    pub fn command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_parts(self) -> (Vec<Delivery>, Vec<Command>) {
        (self.deliveries, self.commands)
    }

    /// Messages addressed to `id`, in send order.
    pub fn messages_for(&self, id: &PlayerId) -> Vec<&ServerMessage> {
        self.deliveries
            .iter()
            .filter(|d| d.to == Recipient::Player(id.clone()))
            .map(|d| &d.message)
            .collect()
    }

    pub fn sender_messages(&self) -> Vec<&ServerMessage> {
        self.deliveries
            .iter()
            .filter(|d| d.to == Recipient::Sender)
            .map(|d| &d.message)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty() && self.commands.is_empty()
    }
}
