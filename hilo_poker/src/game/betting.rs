//! Betting rounds.
//!
//! Turn order is room order, skipping folded players. A round is over once
//! every active player has acted and all of them have the same stake.

use log::{debug, info, warn};

use super::{
    constants::BIG_RAISE,
    entities::{Chips, GamePhase, Player, PlayerId},
    errors::{EngineError, Result},
    functional::find_next_with_wrap,
    state_machine::Room,
};
use crate::net::messages::{BetType, ServerMessage};

pub fn betting_round_complete<'p>(players: impl IntoIterator<Item = &'p Player>) -> bool {
    let active: Vec<&Player> = players.into_iter().filter(|p| p.is_active()).collect();
    if active.len() <= 1 {
        return true;
    }
    let stake = active[0].stake;
    active.iter().all(|p| p.turn_taken && p.stake == stake)
}

/// Labels a bet for the table. `to_call` is the room's highest stake before
/// the bet and `stake` the bettor's stake after it.
pub fn classify_bet(phase: GamePhase, ante: Chips, amount: Chips, to_call: Chips, stake: Chips) -> BetType {
    if amount == 0 {
        BetType::Check
    } else if phase == GamePhase::FirstBetting && to_call == 0 && amount == ante {
        BetType::Ante
    } else if stake <= to_call {
        BetType::Call
    } else if stake >= to_call + BIG_RAISE {
        BetType::Raise10
    } else {
        BetType::Raise
    }
}

impl Room<'_> {
    pub(crate) fn commence_first_betting(&mut self) -> Result<()> {
        self.set_phase(GamePhase::FirstBetting);
        self.broadcast(ServerMessage::FirstRoundBettingCommenced);
        self.ensure_turn_holder_active()?;
        self.announce_turn(self.config.ante)
    }

    pub(crate) fn commence_second_betting(&mut self) -> Result<()> {
        self.set_phase(GamePhase::SecondBetting);
        for id in self.active_ids() {
            self.out
                .to_player(&id, ServerMessage::SecondRoundBettingCommenced);
        }
        self.advance_turn()?;
        self.announce_turn(0)
    }

    pub fn place_bet(&mut self, id: &PlayerId, amount: Chips) -> Result<()> {
        if !self.game.phase.is_betting() || &self.game.current_turn != id {
            debug!("Room {}: out-of-turn bet from {}", self.game.room_code, id);
            return Ok(());
        }
        let player = self.member(id)?;
        if player.folded {
            return Ok(());
        }
        if amount > player.chip_count {
            warn!(
                "Room {}: {} bet {} with only {} chips",
                self.game.room_code, id, amount, player.chip_count
            );
            return Ok(());
        }

        let (phase, ante, to_call) = (self.game.phase, self.config.ante, self.game.to_call);
        let player = self.member_mut(id)?;
        player.turn_taken = true;
        player.stake += amount;
        player.contribution += amount;
        player.chip_count -= amount;
        let bet_type = classify_bet(phase, ante, amount, to_call, player.stake);
        let (stake, chip_count, username) =
            (player.stake, player.chip_count, player.username.clone());

        self.game.to_call = self.game.to_call.max(stake);
        self.game.pot += amount;
        if chip_count == 0 {
            // Nobody can be raised past an all-in player.
            self.game.max_raise_reached = true;
        }

        info!(
            "Room {}: {} bet {} ({:?}), pot {}",
            self.game.room_code, id, amount, bet_type, self.game.pot
        );
        self.broadcast(ServerMessage::BetPlaced {
            id: id.clone(),
            username,
            bet_amount: amount,
            chip_count,
            pot: self.game.pot,
            bet_type,
        });

        self.end_round_or_advance()
    }

    pub(crate) fn end_round_or_advance(&mut self) -> Result<()> {
        if betting_round_complete(self.players.in_room(&self.game.room_code)) {
            return self.complete_betting_round();
        }
        self.advance_turn()?;
        let stake = self.member(&self.game.current_turn.clone())?.stake;
        self.announce_turn(self.game.to_call.saturating_sub(stake))
    }

    pub(crate) fn end_betting_round(&mut self) {
        self.broadcast(ServerMessage::EndBettingRound {
            round: self.game.phase,
        });
        self.game.to_call = 0;
        for player in self.players.in_room_mut(&self.game.room_code) {
            player.stake = 0;
            player.turn_taken = false;
        }
    }

    pub(crate) fn complete_betting_round(&mut self) -> Result<()> {
        let phase = self.game.phase;
        self.end_betting_round();
        match phase {
            GamePhase::FirstBetting => self.deal_second_round(),
            GamePhase::SecondBetting => self.commence_hi_lo(),
            _ => Ok(()),
        }
    }

    /// Passes the turn to the next active player after the current one.
    fn advance_turn(&mut self) -> Result<()> {
        let members: Vec<&Player> = self.players.in_room(&self.game.room_code).collect();
        let next = find_next_with_wrap(&members, &self.game.current_turn, |p| &p.id, |p| {
            p.is_active()
        })
        .map(|p| p.id.clone())
        .ok_or_else(|| EngineError::NoEligiblePlayer(self.game.room_code.clone()))?;
        self.game.current_turn = next;
        Ok(())
    }

    /// The turn holder may have folded or left between hands.
    fn ensure_turn_holder_active(&mut self) -> Result<()> {
        let holder_active = self
            .member(&self.game.current_turn.clone())
            .map(Player::is_active)
            .unwrap_or(false);
        if holder_active {
            Ok(())
        } else {
            self.advance_turn()
        }
    }

    fn announce_turn(&mut self, to_call: Chips) -> Result<()> {
        // A player can never be asked to match more than the poorest
        // active player holds, stake included.
        let max_bet = self
            .players
            .in_room(&self.game.room_code)
            .filter(|p| p.is_active())
            .map(|p| p.chip_count + p.stake)
            .min()
            .unwrap_or(0);
        let current = self.game.current_turn.clone();
        let username = self.member(&current)?.username.clone();

        self.broadcast_with(|recipient| ServerMessage::NextTurn {
            to_call,
            max_bet,
            current_turn_player_id: current.clone(),
            username: username.clone(),
            player_chip_count: recipient.chip_count,
        });
        Ok(())
    }
}
