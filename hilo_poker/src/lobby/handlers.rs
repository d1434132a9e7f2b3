//! Inbound message handling.
//!
//! Handlers only read and write the registries and queue effects on an
//! [`Outbox`]. The connection that sent the message is addressed as
//! [`Recipient::Sender`](crate::net::outbox::Recipient::Sender); everything
//! else is addressed by player.

use log::{debug, info, warn};

use super::{
    codes::{mint_room_code, random_color},
    registry::ServerContext,
};
use crate::{
    game::{
        entities::{CardValue, Chips, Choice, Game, GamePhase, Player, PlayerId, RoomCode, Username},
        errors::Result,
        functional::find_next_with_wrap,
    },
    net::{
        messages::{ClientMessage, Inbound, JoinRejectReason, ServerMessage, parse_inbound},
        outbox::{Command, DeadlineStage, Outbox},
    },
};

impl ServerContext {
    /// Parses and handles one raw frame. `bound` is the player the sending
    /// connection is bound to, if any.
    pub fn handle_raw(&mut self, bound: Option<&PlayerId>, text: &str, out: &mut Outbox) -> Result<()> {
        self.handle_inbound(bound, parse_inbound(text), out)
    }

    pub fn handle_inbound(&mut self, bound: Option<&PlayerId>, inbound: Inbound, out: &mut Outbox) -> Result<()> {
        match inbound {
            Inbound::Message(message) => self.handle(bound, message, out),
            Inbound::Unknown(kind) => {
                debug!("Unknown message type {kind:?}");
                out.to_sender(ServerMessage::UnknownMessage);
                Ok(())
            }
            Inbound::Malformed => {
                debug!("Dropping malformed frame");
                Ok(())
            }
        }
    }

    /// A connection keeps the identity it was first bound to; messages
    /// declaring anyone else are dropped.
    pub fn handle(&mut self, bound: Option<&PlayerId>, message: ClientMessage, out: &mut Outbox) -> Result<()> {
        if let Some(actor) = bound
            && let Some(declared) = message.declared_user()
            && declared != actor
        {
            warn!("Connection bound to {actor} tried to act as {declared}");
            return Ok(());
        }

        match message {
            ClientMessage::Create { user_id, color } => self.create(&user_id, color, out),
            ClientMessage::Enter {
                user_id,
                room_code,
                color,
            } => self.enter_room(&user_id, &room_code, color, out),
            ClientMessage::Refresh { user_id } => self.refresh(&user_id, out),
            other => {
                let Some(actor) = bound else {
                    debug!("Ignoring {:?} from an unbound connection", other);
                    return Ok(());
                };
                self.handle_bound(actor, other, out)
            }
        }
    }

    fn handle_bound(&mut self, actor: &PlayerId, message: ClientMessage, out: &mut Outbox) -> Result<()> {
        match message {
            ClientMessage::Join {
                username, color, ..
            } => self.join(actor, username, color, out),
            ClientMessage::Start { .. } => self.start(actor, out),
            ClientMessage::Leave { .. } => self.leave(actor, out),
            ClientMessage::Discard { value, .. } => self.discard(actor, value, out),
            ClientMessage::BetPlaced { bet_amount, .. } => self.bet(actor, bet_amount, out),
            ClientMessage::Fold { manual, .. } => self.fold(actor, manual, out),
            ClientMessage::EquationResult { result, order, .. } => {
                self.equation(actor, result, order, out)
            }
            ClientMessage::HiLoSelected {
                choices,
                other_equation_result,
                order,
                ..
            } => self.hi_lo(actor, &choices, other_equation_result, order, out),
            ClientMessage::AcknowledgeHandResults { .. } => self.acknowledge(actor, out),
            ClientMessage::Create { .. } | ClientMessage::Enter { .. } | ClientMessage::Refresh { .. } => {
                Ok(())
            }
        }
    }

    // === Rooms ===

    /// A player sitting in a hand that is still being played cannot be
    /// pulled into another room.
    fn seated_elsewhere(&self, id: &PlayerId, code: Option<&RoomCode>) -> bool {
        let Some(player) = self.players.get(id) else {
            return false;
        };
        if Some(&player.room_code) == code || player.out {
            return false;
        }
        self.games
            .get(&player.room_code)
            .is_some_and(|game| game.phase.hand_in_progress())
    }

    fn create(&mut self, id: &PlayerId, color: Option<String>, out: &mut Outbox) -> Result<()> {
        if self.seated_elsewhere(id, None) {
            out.to_sender(ServerMessage::RoomJoinReject {
                reason: JoinRejectReason::InOtherRoom,
            });
            return Ok(());
        }

        let games = &self.games;
        let code = mint_room_code(&mut rand::rng(), self.config.room_code_length, |code| {
            games.contains(code)
        });
        info!("Room {code} created by {id}");
        self.games.insert(Game::new(code.clone(), id.clone()));
        self.enter_room(id, &code, color, out)
    }

    pub fn enter_room(
        &mut self,
        id: &PlayerId,
        code: &RoomCode,
        color: Option<String>,
        out: &mut Outbox,
    ) -> Result<()> {
        let Some(game) = self.games.get(code) else {
            debug!("{id} tried to enter unknown room {code}");
            out.to_sender(ServerMessage::RoomJoinReject {
                reason: JoinRejectReason::NotFound,
            });
            return Ok(());
        };
        let (phase, host_id) = (game.phase, game.host_id.clone());

        if phase != GamePhase::Lobby {
            return self.reenter_in_progress(id, code, host_id, out);
        }

        if self.seated_elsewhere(id, Some(code)) {
            out.to_sender(ServerMessage::RoomJoinReject {
                reason: JoinRejectReason::InOtherRoom,
            });
            return Ok(());
        }

        let member = self.players.get(id).is_some_and(|p| &p.room_code == code);
        if !member {
            let seated = self
                .players
                .in_room(code)
                .filter(|p| !p.out)
                .count();
            if seated >= self.config.max_players {
                out.to_sender(ServerMessage::RoomJoinReject {
                    reason: JoinRejectReason::RoomFull,
                });
                return Ok(());
            }
        }

        let starting_chips = self.config.starting_chips;
        match self.players.get(id).map(|p| p.room_code.clone()) {
            Some(current) if &current == code => {
                if let Some(player) = self.players.get_mut(id) {
                    player.out = false;
                    player.departed = false;
                    if player.chip_count == 0 {
                        player.chip_count = starting_chips;
                    }
                    if let Some(color) = color {
                        player.color = color;
                    }
                }
            }
            Some(previous) => {
                self.depart(id, &previous, out)?;
                if let Some(player) = self.players.get_mut(id) {
                    player.room_code = code.clone();
                    player.reset_for_hand();
                    player.chip_count = starting_chips;
                    player.out = false;
                    player.departed = false;
                    if let Some(color) = color {
                        player.color = color;
                    }
                }
                self.players.move_to_back(id);
                info!("{id} moved from room {previous} to {code}");
            }
            None => {
                let color = color.unwrap_or_else(|| random_color(&mut rand::rng()));
                self.players
                    .insert(Player::new(id.clone(), code.clone(), color, starting_chips));
                info!("{id} entered room {code}");
            }
        }

        out.command(Command::Bind(id.clone()));
        let named: Vec<ServerMessage> = self
            .players
            .in_room(code)
            .filter(|p| p.username.is_some() && !p.out)
            .map(|p| ServerMessage::PlayerJoined {
                id: p.id.clone(),
                host_id: host_id.clone(),
                color: p.color.clone(),
                username: p.username.clone(),
            })
            .collect();
        for message in named {
            out.to_sender(message);
        }
        let joined = self.players.get(id).is_some_and(|p| p.username.is_some());
        out.to_sender(ServerMessage::RoomEntered {
            room_code: code.clone(),
            host_id,
            joined,
            in_progress: false,
        });
        Ok(())
    }

    /// Only players already seated may come back to a hand in progress.
    fn reenter_in_progress(
        &mut self,
        id: &PlayerId,
        code: &RoomCode,
        host_id: PlayerId,
        out: &mut Outbox,
    ) -> Result<()> {
        if !self.players.get(id).is_some_and(|p| &p.room_code == code) {
            out.to_sender(ServerMessage::RoomJoinReject {
                reason: JoinRejectReason::InProgress,
            });
            return Ok(());
        }

        info!("{id} reconnected to room {code}");
        out.command(Command::Bind(id.clone()));
        out.to_sender(ServerMessage::RoomEntered {
            room_code: code.clone(),
            host_id,
            joined: true,
            in_progress: true,
        });
        self.room(code, out)?.send_snapshot_to_sender(id);
        Ok(())
    }

    fn join(&mut self, id: &PlayerId, username: Username, color: Option<String>, out: &mut Outbox) -> Result<()> {
        let Some(code) = self.room_of(id) else {
            return Ok(());
        };
        let Some(player) = self.players.get_mut(id) else {
            return Ok(());
        };
        if player.username.is_some() || username.is_empty() {
            debug!("Ignoring join from {id}");
            return Ok(());
        }
        player.username = Some(username.clone());
        if let Some(color) = color {
            player.color = color;
        }
        let color = player.color.clone();
        info!("{id} joined room {code} as {username}");

        let mut room = self.room(&code, out)?;
        let host_id = room.game.host_id.clone();
        room.broadcast(ServerMessage::PlayerJoined {
            id: id.clone(),
            host_id,
            color,
            username: Some(username),
        });
        Ok(())
    }

    fn start(&mut self, id: &PlayerId, out: &mut Outbox) -> Result<()> {
        match self.room_of(id) {
            Some(code) => self.room(&code, out)?.start(id),
            None => {
                out.to_sender(ServerMessage::RejectStart);
                Ok(())
            }
        }
    }

    fn leave(&mut self, id: &PlayerId, out: &mut Outbox) -> Result<()> {
        match self.room_of(id) {
            Some(code) => self.depart(id, &code, out),
            None => Ok(()),
        }
    }

    /// Takes a player out of `code`: hands the host role on if needed,
    /// tells the room, and stops the hand from waiting on them.
    fn depart(&mut self, id: &PlayerId, code: &RoomCode, out: &mut Outbox) -> Result<()> {
        if !self.games.contains(code) {
            return Ok(());
        }
        let was_out = self.players.get(id).is_some_and(|p| p.out);
        let members: Vec<&Player> = self.players.in_room(code).collect();
        let successor = find_next_with_wrap(&members, id, |p| &p.id, |p| !p.out && &p.id != id)
            .map(|p| p.id.clone());

        let mut room = self.room(code, out)?;
        if &room.game.host_id == id
            && let Some(successor) = successor
        {
            info!("Room {code}: host passes from {id} to {successor}");
            room.game.host_id = successor;
        }
        let host_id = room.game.host_id.clone();
        room.broadcast(ServerMessage::PlayerLeft {
            id: id.clone(),
            host_id,
        });

        if was_out {
            Ok(())
        } else {
            info!("{id} left room {code}");
            room.withdraw(id)
        }
    }

    fn refresh(&mut self, id: &PlayerId, out: &mut Outbox) -> Result<()> {
        out.command(Command::Bind(id.clone()));
        if let Some(code) = self.room_of(id) {
            out.to_sender(ServerMessage::SuggestRoom { room_code: code });
        }
        Ok(())
    }

    // === Hand Actions ===

    fn discard(&mut self, id: &PlayerId, value: CardValue, out: &mut Outbox) -> Result<()> {
        match self.room_of(id) {
            Some(code) => self.room(&code, out)?.discard(id, value),
            None => Ok(()),
        }
    }

    fn bet(&mut self, id: &PlayerId, amount: Chips, out: &mut Outbox) -> Result<()> {
        match self.room_of(id) {
            Some(code) => self.room(&code, out)?.place_bet(id, amount),
            None => Ok(()),
        }
    }

    fn fold(&mut self, id: &PlayerId, manual: bool, out: &mut Outbox) -> Result<()> {
        match self.room_of(id) {
            Some(code) => self.room(&code, out)?.fold(id, manual),
            None => Ok(()),
        }
    }

    fn equation(&mut self, id: &PlayerId, result: f64, order: Vec<usize>, out: &mut Outbox) -> Result<()> {
        match self.room_of(id) {
            Some(code) => self.room(&code, out)?.submit_equation(id, result, order),
            None => Ok(()),
        }
    }

    fn hi_lo(
        &mut self,
        id: &PlayerId,
        choices: &[Choice],
        other_result: Option<f64>,
        order: Option<Vec<usize>>,
        out: &mut Outbox,
    ) -> Result<()> {
        match self.room_of(id) {
            Some(code) => self
                .room(&code, out)?
                .select_hi_lo(id, choices, other_result, order),
            None => Ok(()),
        }
    }

    fn acknowledge(&mut self, id: &PlayerId, out: &mut Outbox) -> Result<()> {
        match self.room_of(id) {
            Some(code) => self.room(&code, out)?.acknowledge_results(id),
            None => Ok(()),
        }
    }

    // === Timers ===

    /// A deadline armed by `commence-equation-forming` fired.
    pub fn equation_deadline(
        &mut self,
        code: &RoomCode,
        hand_number: u32,
        stage: DeadlineStage,
        out: &mut Outbox,
    ) -> Result<()> {
        if !self.games.contains(code) {
            debug!("Deadline for vanished room {code}");
            return Ok(());
        }
        self.room(code, out)?.equation_deadline(hand_number, stage)
    }
}
