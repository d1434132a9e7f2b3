//! Phase state machine for one room.
//!
//! A [`Room`] borrows one game, the player registry and the outbox for the
//! duration of a single inbound message. Every transition runs to completion
//! inside that borrow, so a room's state is only ever touched by one handler
//! at a time.
//!
//! ```text
//! Lobby -> FirstDeal -> FirstBetting -> SecondDeal -> EquationForming
//!       -> SecondBetting (skipped after an all-in) -> HiLoSelection
//!       -> ResultViewing -> FirstDeal ...
//! ```
//!
//! During betting and equation forming a hand collapses early when one
//! active player is left (they take the pot) or none are (contributions are
//! refunded).

use log::{debug, info, warn};

use super::{
    entities::{Card, Choice, Choices, Game, GamePhase, Player, PlayerId, RoomCode},
    errors::{EngineError, Result},
    functional::{highest_card, is_permutation, lowest_card, reorder},
    resolver::{Contestant, Resolution, resolve},
    visibility::{CardView, reveal_hand, view_hand},
};
use crate::{
    lobby::{
        config::GameConfig,
        registry::{DeckSource, PlayerRepository},
    },
    net::{
        messages::{ResultRow, RoundResult, ServerMessage},
        outbox::{Command, DeadlineStage, Outbox},
    },
};

pub struct Room<'a> {
    pub game: &'a mut Game,
    pub players: &'a mut PlayerRepository,
    pub config: &'a GameConfig,
    deck_source: &'a DeckSource,
    pub out: &'a mut Outbox,
}

impl<'a> Room<'a> {
    pub fn new(
        game: &'a mut Game,
        players: &'a mut PlayerRepository,
        config: &'a GameConfig,
        deck_source: &'a DeckSource,
        out: &'a mut Outbox,
    ) -> Self {
        Self {
            game,
            players,
            config,
            deck_source,
            out,
        }
    }

    // === Membership ===

    pub fn code(&self) -> &RoomCode {
        &self.game.room_code
    }

    pub fn phase(&self) -> GamePhase {
        self.game.phase
    }

    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.players.ids_in_room(&self.game.room_code)
    }

    pub fn member(&self, id: &PlayerId) -> Result<&Player> {
        self.players
            .get(id)
            .filter(|p| p.room_code == self.game.room_code)
            .ok_or_else(|| EngineError::PlayerNotFound(id.clone()))
    }

    pub(crate) fn member_mut(&mut self, id: &PlayerId) -> Result<&mut Player> {
        let code = &self.game.room_code;
        self.players
            .get_mut(id)
            .filter(|p| &p.room_code == code)
            .ok_or_else(|| EngineError::PlayerNotFound(id.clone()))
    }

    pub(crate) fn active_ids(&self) -> Vec<PlayerId> {
        self.players
            .in_room(&self.game.room_code)
            .filter(|p| p.is_active())
            .map(|p| p.id.clone())
            .collect()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.players
            .in_room(&self.game.room_code)
            .filter(|p| p.is_active())
            .count()
    }

    /// Members that have not been eliminated or left.
    pub fn in_play_count(&self) -> usize {
        self.players
            .in_room(&self.game.room_code)
            .filter(|p| !p.out)
            .count()
    }

    fn all_active<F: Fn(&Player) -> bool>(&self, pred: F) -> bool {
        self.players
            .in_room(&self.game.room_code)
            .filter(|p| p.is_active())
            .all(pred)
    }

    // === Delivery ===

    pub fn broadcast(&mut self, message: ServerMessage) {
        for recipient in self.players.in_room(&self.game.room_code) {
            self.out.to_player(&recipient.id, message.clone());
        }
    }

    /// Sends each member a message built for them specifically.
    pub fn broadcast_with<F>(&mut self, build: F)
    where
        F: Fn(&Player) -> ServerMessage,
    {
        for recipient in self.players.in_room(&self.game.room_code) {
            self.out.to_player(&recipient.id, build(recipient));
        }
    }

    fn deal_message(owner: &Player, recipient: &PlayerId) -> ServerMessage {
        ServerMessage::Deal {
            id: owner.id.clone(),
            username: owner.username.clone(),
            chip_count: owner.chip_count,
            multiplication_card_dealt: owner.needs_to_discard,
            hand: view_hand(&owner.hand, &owner.id, recipient),
        }
    }

    /// Shows `owner`'s hand to the room, redacted per recipient.
    pub fn send_hand(&mut self, owner: &PlayerId) -> Result<()> {
        let owner = self.member(owner)?.clone();
        self.broadcast_with(|recipient| Self::deal_message(&owner, &recipient.id));
        Ok(())
    }

    pub fn send_all_hands(&mut self) -> Result<()> {
        for id in self.member_ids() {
            self.send_hand(&id)?;
        }
        Ok(())
    }

    /// Every member's hand as `recipient` may see it, for a reconnecting client.
    pub fn send_snapshot_to_sender(&mut self, recipient: &PlayerId) {
        let snapshot: Vec<ServerMessage> = self
            .players
            .in_room(&self.game.room_code)
            .map(|owner| Self::deal_message(owner, recipient))
            .collect();
        for message in snapshot {
            self.out.to_sender(message);
        }
    }

    pub(crate) fn set_phase(&mut self, phase: GamePhase) {
        let previous = self.game.phase;
        if previous == GamePhase::EquationForming && phase != GamePhase::EquationForming {
            self.out
                .command(Command::DisarmDeadline(self.game.room_code.clone()));
        }
        debug!("Room {}: {} -> {}", self.game.room_code, previous, phase);
        self.game.phase = phase;
    }

    // === Hand Lifecycle ===

    /// `start` from a client. Only the host may start, only from the lobby,
    /// and only with enough players.
    pub fn start(&mut self, requester: &PlayerId) -> Result<()> {
        if self.game.phase != GamePhase::Lobby
            || requester != &self.game.host_id
            || self.in_play_count() < self.config.min_players
        {
            debug!("Room {}: start rejected for {}", self.game.room_code, requester);
            self.out.to_sender(ServerMessage::RejectStart);
            return Ok(());
        }

        info!(
            "Room {}: game started with {} players",
            self.game.room_code,
            self.in_play_count()
        );
        self.broadcast(ServerMessage::GameStarted);
        self.begin_hand()
    }

    pub fn begin_hand(&mut self) -> Result<()> {
        if self.in_play_count() < self.config.min_players {
            return self.finish_game();
        }

        for player in self.players.in_room_mut(&self.game.room_code) {
            player.reset_for_hand();
            player.folded = player.out;
        }
        self.game.deck = (self.deck_source)();
        self.game.pot = 0;
        self.game.to_call = 0;
        self.game.max_raise_reached = false;
        self.game.equation_window_closed = false;

        info!(
            "Room {}: beginning hand {}",
            self.game.room_code, self.game.hand_number
        );
        self.broadcast(ServerMessage::BeginHand {
            hand_number: self.game.hand_number,
        });
        self.set_phase(GamePhase::FirstDeal);
        self.deal_first_round()?;

        if !self.discards_pending() {
            self.commence_first_betting()?;
        }
        Ok(())
    }

    /// Fewer than two players can still play: back to the lobby.
    fn finish_game(&mut self) -> Result<()> {
        let winner = self
            .players
            .in_room(&self.game.room_code)
            .find(|p| !p.out)
            .map(|p| (p.id.clone(), p.username.clone()));

        info!("Room {}: game over", self.game.room_code);
        for player in self.players.in_room_mut(&self.game.room_code) {
            player.reset_for_hand();
        }
        self.set_phase(GamePhase::Lobby);
        self.game.pot = 0;
        self.game.to_call = 0;

        let (winner_id, username) = match winner {
            Some((id, username)) => (Some(id), username),
            None => (None, None),
        };
        self.broadcast(ServerMessage::GameOver {
            winner_id,
            username,
        });
        Ok(())
    }

    fn end_hand(&mut self) -> Result<()> {
        self.game.max_raise_reached = false;
        self.game.hand_number += 1;

        let eliminated: Vec<(PlayerId, Option<_>)> = self
            .players
            .in_room(&self.game.room_code)
            .filter(|p| p.chip_count == 0 && !p.out)
            .map(|p| (p.id.clone(), p.username.clone()))
            .collect();
        for (id, username) in eliminated {
            info!("Room {}: {} is out of chips", self.game.room_code, id);
            self.member_mut(&id)?.out = true;
            self.broadcast(ServerMessage::Kicked {
                user_id: id,
                username,
            });
        }

        self.begin_hand()
    }

    // === Folding & Withdrawal ===

    fn mark_folded(&mut self, id: &PlayerId) -> Result<()> {
        let player = self.member_mut(id)?;
        player.folded = true;
        player.needs_to_discard = false;
        for card in &mut player.hand {
            card.hidden = true;
        }
        let player = player.clone();
        self.broadcast_with(|recipient| ServerMessage::PlayerFolded {
            id: player.id.clone(),
            username: player.username.clone(),
            hand: view_hand(&player.hand, &player.id, &recipient.id),
        });
        Ok(())
    }

    pub fn fold(&mut self, id: &PlayerId, manual: bool) -> Result<()> {
        if !self.game.phase.allows_fold() {
            debug!("Room {}: fold by {} outside a fold phase", self.game.room_code, id);
            return Ok(());
        }
        if self.member(id)?.folded {
            return Ok(());
        }

        let was_turn_holder = &self.game.current_turn == id;
        info!(
            "Room {}: {} folded{}",
            self.game.room_code,
            id,
            if manual { "" } else { " (no equation)" }
        );
        self.mark_folded(id)?;
        self.after_withdrawal(was_turn_holder)
    }

    /// Takes a departing player out of the current hand so the room never
    /// waits on them.
    pub fn withdraw(&mut self, id: &PlayerId) -> Result<()> {
        let player = self.member_mut(id)?;
        player.out = true;
        player.departed = true;
        player.needs_to_discard = false;
        let already_folded = player.folded;

        if self.game.phase == GamePhase::Lobby {
            return Ok(());
        }

        let was_turn_holder = &self.game.current_turn == id;
        if !already_folded && self.game.phase != GamePhase::ResultViewing {
            self.mark_folded(id)?;
        }
        self.after_withdrawal(was_turn_holder)
    }

    /// Re-evaluates whatever the current phase is waiting on after someone
    /// stopped participating.
    fn after_withdrawal(&mut self, was_turn_holder: bool) -> Result<()> {
        let phase = self.game.phase;
        if phase.hand_in_progress() && phase != GamePhase::ResultViewing {
            match self.active_count() {
                0 => return self.refund_all(),
                1 => return self.award_sole_survivor(),
                _ => {}
            }
        }

        match phase {
            GamePhase::Lobby => Ok(()),
            GamePhase::FirstDeal | GamePhase::SecondDeal => {
                if self.discards_pending() {
                    Ok(())
                } else {
                    self.after_discards()
                }
            }
            GamePhase::FirstBetting | GamePhase::SecondBetting => {
                if was_turn_holder {
                    self.end_round_or_advance()
                } else if super::betting::betting_round_complete(
                    self.players.in_room(&self.game.room_code),
                ) {
                    self.complete_betting_round()
                } else {
                    Ok(())
                }
            }
            GamePhase::EquationForming => {
                if self.all_active(|p| p.equation_result.is_some()) {
                    self.finish_equation_forming()
                } else {
                    Ok(())
                }
            }
            GamePhase::HiLoSelection => {
                if self.all_active(|p| !p.choices.is_empty()) {
                    self.show_results()
                } else {
                    Ok(())
                }
            }
            GamePhase::ResultViewing => {
                if self.all_acknowledged() {
                    self.end_hand()
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Resets stakes, announcing the end of the round if one was running.
    fn close_betting_round(&mut self) {
        if self.game.phase.is_betting() {
            self.end_betting_round();
        } else {
            self.game.to_call = 0;
            for player in self.players.in_room_mut(&self.game.room_code) {
                player.stake = 0;
                player.turn_taken = false;
            }
        }
    }

    /// Everyone folded: every contribution goes back and the hand restarts.
    fn refund_all(&mut self) -> Result<()> {
        info!(
            "Room {}: no active players left, refunding {} chips",
            self.game.room_code, self.game.pot
        );
        self.broadcast(ServerMessage::RoundResult(RoundResult {
            message: "No one formed an equation, so every contribution is returned."
                .to_string(),
            because_no_one_formed_equation: true,
            ..Default::default()
        }));
        for player in self.players.in_room_mut(&self.game.room_code) {
            player.chip_count += player.contribution;
            player.contribution = 0;
        }
        self.game.pot = 0;
        self.close_betting_round();
        self.end_hand()
    }

    /// One active player left: they take the pot without showing anything.
    fn award_sole_survivor(&mut self) -> Result<()> {
        let winner_id = self
            .active_ids()
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::NoEligiblePlayer(self.game.room_code.clone()))?;
        let winner_name = self.member(&winner_id)?.display_name();
        let pot = self.game.pot;

        info!(
            "Room {}: {} takes the pot of {} by default",
            self.game.room_code, winner_id, pot
        );
        self.broadcast_with(|recipient| {
            let message = if recipient.id == winner_id {
                "Everyone else folded. You take the pot by default.".to_string()
            } else {
                format!("Everyone but {winner_name} has folded. They take the pot of {pot}.")
            };
            ServerMessage::RoundResult(RoundResult {
                message,
                because_all_but_one_folded: true,
                ..Default::default()
            })
        });

        let winner = self.member_mut(&winner_id)?;
        winner.chip_count += pot;
        let chip_count = winner.chip_count;
        self.game.pot = 0;
        self.broadcast(ServerMessage::ChipDistribution {
            id: winner_id,
            chip_count,
        });

        self.close_betting_round();
        self.end_hand()
    }

    // === Equation Forming ===

    pub(crate) fn commence_equation_forming(&mut self) -> Result<()> {
        self.set_phase(GamePhase::EquationForming);
        self.game.equation_window_closed = false;

        let deadline_secs = self.config.equation_window_secs;
        self.broadcast_with(|recipient| ServerMessage::CommenceEquationForming {
            folded: recipient.folded,
            deadline_secs,
        });
        self.out.command(Command::ArmDeadline {
            room_code: self.game.room_code.clone(),
            hand_number: self.game.hand_number,
            stage: DeadlineStage::Window,
            after: self.config.equation_window(),
        });
        Ok(())
    }

    pub fn submit_equation(&mut self, id: &PlayerId, result: f64, order: Vec<usize>) -> Result<()> {
        if self.game.phase != GamePhase::EquationForming {
            debug!("Room {}: late equation from {}", self.game.room_code, id);
            return Ok(());
        }
        let player = self.member(id)?;
        if player.folded || player.equation_result.is_some() {
            return Ok(());
        }
        if !result.is_finite() || !is_permutation(&order, player.hand.len()) {
            warn!(
                "Room {}: {} sent an unusable equation ({} cards, order {:?})",
                self.game.room_code,
                id,
                player.hand.len(),
                order
            );
            return Ok(());
        }

        let player = self.member_mut(id)?;
        player.hand = reorder(&player.hand, &order);
        player.equation_result = Some(result);
        player.equation_order = order;
        let player = player.clone();

        // The arrangement is public, the value stays private until showdown.
        self.broadcast_with(|recipient| ServerMessage::PlayerFormedEquation {
            id: player.id.clone(),
            username: player.username.clone(),
            chip_count: player.chip_count,
            hand: view_hand(&player.hand, &player.id, &recipient.id),
        });

        if self.all_active(|p| p.equation_result.is_some()) {
            self.finish_equation_forming()?;
        }
        Ok(())
    }

    fn finish_equation_forming(&mut self) -> Result<()> {
        if !self.game.equation_window_closed {
            self.game.equation_window_closed = true;
            self.broadcast(ServerMessage::EndEquationForming);
        }

        match self.active_count() {
            0 => return self.refund_all(),
            1 => return self.award_sole_survivor(),
            _ => {}
        }

        if self.game.max_raise_reached {
            for id in self.active_ids() {
                self.out
                    .to_player(&id, ServerMessage::SecondRoundBettingSkipped);
            }
            self.commence_hi_lo()
        } else {
            self.commence_second_betting()
        }
    }

    /// A deadline armed for this room fired. Stale deadlines (another hand,
    /// another phase) are ignored.
    pub fn equation_deadline(&mut self, hand_number: u32, stage: DeadlineStage) -> Result<()> {
        if self.game.phase != GamePhase::EquationForming || self.game.hand_number != hand_number {
            debug!(
                "Room {}: ignoring stale {:?} deadline for hand {}",
                self.game.room_code, stage, hand_number
            );
            return Ok(());
        }

        let pending: Vec<PlayerId> = self
            .players
            .in_room(&self.game.room_code)
            .filter(|p| p.is_active() && p.equation_result.is_none())
            .map(|p| p.id.clone())
            .collect();

        match stage {
            DeadlineStage::Window => {
                info!(
                    "Room {}: equation window closed, {} still forming",
                    self.game.room_code,
                    pending.len()
                );
                if !self.game.equation_window_closed {
                    self.game.equation_window_closed = true;
                    self.broadcast(ServerMessage::EndEquationForming);
                }
                for id in &pending {
                    self.out.to_player(id, ServerMessage::RequestFormedEquation);
                }
                self.out.command(Command::ArmDeadline {
                    room_code: self.game.room_code.clone(),
                    hand_number,
                    stage: DeadlineStage::Grace,
                    after: self.config.equation_grace(),
                });
                Ok(())
            }
            DeadlineStage::Grace => {
                for id in &pending {
                    info!("Room {}: {} folded for not answering", self.game.room_code, id);
                    self.mark_folded(id)?;
                }
                self.after_withdrawal(false)
            }
        }
    }

    // === Hi-Lo Selection & Results ===

    pub(crate) fn commence_hi_lo(&mut self) -> Result<()> {
        self.set_phase(GamePhase::HiLoSelection);
        self.broadcast(ServerMessage::HiLoSelection);
        Ok(())
    }

    pub fn select_hi_lo(
        &mut self,
        id: &PlayerId,
        choices: &[Choice],
        other_result: Option<f64>,
        order: Option<Vec<usize>>,
    ) -> Result<()> {
        if self.game.phase != GamePhase::HiLoSelection {
            return Ok(());
        }
        let player = self.member(id)?;
        let Some(result) = player.equation_result else {
            return Ok(());
        };
        if player.folded || !player.choices.is_empty() {
            return Ok(());
        }
        let chosen: Choices = choices.iter().collect();
        if chosen.is_empty() {
            return Ok(());
        }

        let player = self.member_mut(id)?;
        if chosen.is_swing() {
            let (Some(other), Some(order)) = (other_result, order) else {
                warn!("{id} chose both sides without a second equation");
                return Ok(());
            };
            if !other.is_finite() || !is_permutation(&order, player.hand.len()) {
                warn!("{id} sent an unusable second equation");
                return Ok(());
            }
            let other_hand = reorder(&player.hand, &order);
            player.other_hand = other_hand.clone();
            player.other_equation_result = Some(other);
            if result <= other {
                player.low_equation_result = Some(result);
                player.low_hand = player.hand.clone();
                player.high_equation_result = Some(other);
                player.high_hand = other_hand;
            } else {
                player.low_equation_result = Some(other);
                player.low_hand = other_hand;
                player.high_equation_result = Some(result);
                player.high_hand = player.hand.clone();
            }
        } else if chosen.low {
            player.low_equation_result = Some(result);
            player.low_hand = player.hand.clone();
        } else {
            player.high_equation_result = Some(result);
            player.high_hand = player.hand.clone();
        }
        player.choices = chosen;

        if self.all_active(|p| !p.choices.is_empty()) {
            self.show_results()?;
        }
        Ok(())
    }

    fn show_results(&mut self) -> Result<()> {
        self.set_phase(GamePhase::ResultViewing);

        for player in self.players.in_room_mut(&self.game.room_code) {
            if player.is_active() {
                for card in &mut player.hand {
                    card.hidden = false;
                }
            }
        }
        for id in self.active_ids() {
            self.send_hand(&id)?;
        }

        let contestants: Vec<Contestant> = self
            .players
            .in_room(&self.game.room_code)
            .filter(|p| p.is_active())
            .map(Contestant::from)
            .collect();
        let pot = self.game.pot;
        let resolution = resolve(&contestants, pot, self.config.targets());

        if resolution.has_winner() {
            for (id, amount) in &resolution.payouts {
                self.member_mut(id)?.chip_count += amount;
            }
        } else {
            for player in self.players.in_room_mut(&self.game.room_code) {
                player.chip_count += player.contribution;
            }
        }
        self.game.pot = 0;

        for player in self.players.in_room_mut(&self.game.room_code) {
            player.is_lo_contender = resolution.low.contenders.contains(&player.id);
            player.is_hi_contender = resolution.high.contenders.contains(&player.id);
        }

        let message = self.describe(&resolution, pot);
        info!("Room {}: {}", self.game.room_code, message);
        let results = self
            .players
            .in_room(&self.game.room_code)
            .filter(|p| p.is_active())
            .map(|p| self.result_row(p, &resolution))
            .collect();
        self.broadcast(ServerMessage::RoundResult(RoundResult {
            message,
            lo_winner: resolution.low.winner.clone(),
            hi_winner: resolution.high.winner.clone(),
            results,
            ..Default::default()
        }));

        for (id, _) in &resolution.payouts {
            let chip_count = self.member(id)?.chip_count;
            self.broadcast(ServerMessage::ChipDistribution {
                id: id.clone(),
                chip_count,
            });
        }
        Ok(())
    }

    fn name_of(&self, id: &Option<PlayerId>) -> String {
        id.as_ref()
            .and_then(|id| self.players.get(id))
            .map(Player::display_name)
            .unwrap_or_default()
    }

    fn describe(&self, resolution: &Resolution, pot: u32) -> String {
        if resolution.sweeper.is_some() {
            return format!(
                "{} swept both sides and takes the pot of {pot}.",
                self.name_of(&resolution.sweeper)
            );
        }
        let low = self.name_of(&resolution.low.winner);
        let high = self.name_of(&resolution.high.winner);
        match resolution.payouts.as_slice() {
            [] => "Nobody contested the pot, so every contribution is returned.".to_string(),
            [_] if resolution.low.winner.is_some() => {
                format!("{low} wins low and takes the pot of {pot}.")
            }
            [_] => format!("{high} wins high and takes the pot of {pot}."),
            _ if resolution.discarded > 0 => format!(
                "{low} wins low and {high} wins high, splitting the pot of {pot}. One chip is discarded."
            ),
            _ => format!("{low} wins low and {high} wins high, splitting the pot of {pot}."),
        }
    }

    fn result_row(&self, player: &Player, resolution: &Resolution) -> ResultRow {
        let targets = self.config.targets();
        let is_lo_winner = resolution.low.winner.as_ref() == Some(&player.id);
        let is_hi_winner = resolution.high.winner.as_ref() == Some(&player.id);
        let winning_card = |winner: bool, card: Option<Card>| {
            if winner { card.map(CardView::from) } else { None }
        };

        ResultRow {
            id: player.id.clone(),
            username: player.username.clone(),
            chip_count: player.chip_count,
            chip_differential: resolution.payout_for(&player.id),
            low_hand: reveal_hand(&player.low_hand),
            high_hand: reveal_hand(&player.high_hand),
            folded: player.folded,
            low_card: lowest_card(&player.hand).map(CardView::from),
            high_card: highest_card(&player.hand).map(CardView::from),
            choices: player.choices.to_vec(),
            low_result: player.low_equation_result,
            high_result: player.high_equation_result,
            low_difference: player
                .low_equation_result
                .map(|r| (r - targets.low).abs()),
            high_difference: player
                .high_equation_result
                .map(|r| (r - targets.high).abs()),
            is_lo_winner,
            is_hi_winner,
            lo_winner_low_card: winning_card(is_lo_winner, resolution.low.winning_card),
            hi_winner_high_card: winning_card(is_hi_winner, resolution.high.winning_card),
            is_lo_contender: player.is_lo_contender,
            is_hi_contender: player.is_hi_contender,
        }
    }

    fn all_acknowledged(&self) -> bool {
        self.players
            .in_room(&self.game.room_code)
            .filter(|p| !p.departed)
            .all(|p| p.acknowledged_results)
    }

    pub fn acknowledge_results(&mut self, id: &PlayerId) -> Result<()> {
        if self.game.phase != GamePhase::ResultViewing {
            return Ok(());
        }
        let player = self.member_mut(id)?;
        if player.acknowledged_results {
            return Ok(());
        }
        player.acknowledged_results = true;

        if self.all_acknowledged() {
            self.end_hand()?;
        }
        Ok(())
    }
}
