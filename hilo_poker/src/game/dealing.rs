use log::{debug, info};

use super::{
    entities::{Card, CardValue, GamePhase, Operator, PlayerId},
    errors::Result,
    state_machine::Room,
};
use crate::net::messages::ServerMessage;

impl Room<'_> {
    /// Granted operators and one hidden number for every player still in
    /// play, then a second pass of two open cards each.
    pub(crate) fn deal_first_round(&mut self) -> Result<()> {
        let ids = self.active_ids();
        for id in &ids {
            let hidden = self.game.deck.draw_number()?.hidden();
            let player = self.member_mut(id)?;
            player
                .hand
                .extend(Operator::GRANTED.into_iter().map(Card::operator));
            player.hand.push(hidden);
        }
        for id in &ids {
            self.deal_open_cards(id, 2)?;
        }
        self.send_all_hands()
    }

    /// Deals `count` face-up cards to one player.
    ///
    /// At most one drawable operator lands per deal: once one is drawn the
    /// remaining cards come from the numbered part of the deck. A root pulls
    /// an extra number to go under it and a multiply obliges a discard.
    pub(crate) fn deal_open_cards(&mut self, id: &PlayerId, count: usize) -> Result<()> {
        let mut drawn = Vec::with_capacity(count + 1);
        for _ in 0..count {
            let card = if drawn.iter().any(Card::is_operator) {
                self.game.deck.draw_number()?
            } else {
                self.game.deck.draw_any()?
            };
            drawn.push(card);
        }
        if drawn.iter().any(|c| c.is(Operator::Root)) {
            drawn.push(self.game.deck.draw_number()?);
        }
        let must_discard = drawn.iter().any(|c| c.is(Operator::Multiply));

        let player = self.member_mut(id)?;
        player.hand.extend(drawn);
        player.needs_to_discard |= must_discard;
        if must_discard {
            debug!("{id} was dealt a multiply and must discard");
        }
        Ok(())
    }

    /// One more open card for every active player.
    pub(crate) fn deal_second_round(&mut self) -> Result<()> {
        self.set_phase(GamePhase::SecondDeal);
        for id in self.active_ids() {
            self.deal_open_cards(&id, 1)?;
            self.send_hand(&id)?;
        }

        if !self.discards_pending() {
            self.commence_equation_forming()?;
        }
        Ok(())
    }

    pub(crate) fn discards_pending(&self) -> bool {
        self.players
            .in_room(&self.game.room_code)
            .any(|p| p.is_active() && p.needs_to_discard)
    }

    /// Swaps the named card for a fresh number. Only a player who was dealt
    /// a multiply may discard, and only during a deal. The granted operators
    /// can never be discarded.
    pub fn discard(&mut self, id: &PlayerId, value: CardValue) -> Result<()> {
        if !self.game.phase.is_dealing() {
            debug!("Room {}: discard by {} outside a deal", self.game.room_code, id);
            return Ok(());
        }
        let player = self.member(id)?;
        if !player.needs_to_discard || player.folded {
            return Ok(());
        }
        let Some(idx) = player
            .hand
            .iter()
            .position(|c| c.value == value && (c.is(Operator::Multiply) || !c.is_operator()))
        else {
            debug!("{id} tried to discard {value}, which they do not hold");
            return Ok(());
        };
        let username = player.username.clone();

        let replacement = self.game.deck.draw_number()?;
        let player = self.member_mut(id)?;
        player.hand.remove(idx);
        player.hand.push(replacement);
        player.needs_to_discard = false;
        info!("{id} discarded {value}");

        self.broadcast(ServerMessage::PlayerDiscarded {
            id: id.clone(),
            username,
            value,
        });
        self.send_hand(id)?;

        if !self.discards_pending() {
            self.after_discards()?;
        }
        Ok(())
    }

    /// Moves on once the deal has no outstanding discards.
    pub(crate) fn after_discards(&mut self) -> Result<()> {
        match self.game.phase {
            GamePhase::FirstDeal => self.commence_first_betting(),
            GamePhase::SecondDeal => self.commence_equation_forming(),
            _ => Ok(()),
        }
    }
}
