//! In-memory room and player registries.
//!
//! Rooms never own their players. A room's members are the players whose
//! `room_code` points at it, in the order they were first seen, and that
//! order is the betting order.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::config::GameConfig;
use crate::{
    game::{
        entities::{Deck, Game, Player, PlayerId, RoomCode},
        errors::{EngineError, Result},
        state_machine::Room,
    },
    net::outbox::Outbox,
};

#[derive(Debug, Default)]
pub struct GameRepository {
    games: HashMap<RoomCode, Game>,
}

impl GameRepository {
    pub fn insert(&mut self, game: Game) {
        self.games.insert(game.room_code.clone(), game);
    }

    pub fn get(&self, code: &RoomCode) -> Option<&Game> {
        self.games.get(code)
    }

    pub fn get_mut(&mut self, code: &RoomCode) -> Option<&mut Game> {
        self.games.get_mut(code)
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.games.contains_key(code)
    }

    pub fn remove(&mut self, code: &RoomCode) -> Option<Game> {
        self.games.remove(code)
    }

    /// Codes of games created more than `ttl` before `now`.
    pub fn expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> Vec<RoomCode> {
        self.games
            .values()
            .filter(|game| game.is_expired(now, ttl))
            .map(|game| game.room_code.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct PlayerRepository {
    players: Vec<Player>,
}

impl PlayerRepository {
    /// Adds a player, or replaces the one with the same id in place.
    pub fn insert(&mut self, player: Player) {
        match self.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player,
            None => self.players.push(player),
        }
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.get(id).is_some()
    }

    /// Moves a player to the back of the turn order.
    pub fn move_to_back(&mut self, id: &PlayerId) {
        if let Some(idx) = self.players.iter().position(|p| &p.id == id) {
            let player = self.players.remove(idx);
            self.players.push(player);
        }
    }

    pub fn in_room<'a>(&'a self, code: &'a RoomCode) -> impl Iterator<Item = &'a Player> + 'a {
        self.players.iter().filter(move |p| &p.room_code == code)
    }

    pub fn in_room_mut<'a>(
        &'a mut self,
        code: &'a RoomCode,
    ) -> impl Iterator<Item = &'a mut Player> + 'a {
        self.players.iter_mut().filter(move |p| &p.room_code == code)
    }

    pub fn ids_in_room(&self, code: &RoomCode) -> Vec<PlayerId> {
        self.in_room(code).map(|p| p.id.clone()).collect()
    }

    pub fn count_in_room(&self, code: &RoomCode) -> usize {
        self.in_room(code).count()
    }

    /// Drops every member of a room. Returns how many were removed.
    pub fn remove_room(&mut self, code: &RoomCode) -> usize {
        let before = self.players.len();
        self.players.retain(|p| &p.room_code != code);
        before - self.players.len()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Builds the deck for each new hand.
pub type DeckSource = Box<dyn Fn() -> Deck + Send>;

/// Everything the handlers mutate: both registries plus the room rules.
pub struct ServerContext {
    pub games: GameRepository,
    pub players: PlayerRepository,
    pub config: GameConfig,
    deck_source: DeckSource,
}

impl ServerContext {
    pub fn new(config: GameConfig) -> Self {
        Self {
            games: GameRepository::default(),
            players: PlayerRepository::default(),
            config,
            deck_source: Box::new(Deck::shuffled),
        }
    }

    /// Replaces the shuffled deck with a custom source.
    pub fn with_deck_source(mut self, deck_source: DeckSource) -> Self {
        self.deck_source = deck_source;
        self
    }

    /// Borrows one room for a state transition.
    pub fn room<'a>(&'a mut self, code: &RoomCode, out: &'a mut Outbox) -> Result<Room<'a>> {
        let game = self
            .games
            .get_mut(code)
            .ok_or_else(|| EngineError::RoomNotFound(code.clone()))?;
        Ok(Room::new(
            game,
            &mut self.players,
            &self.config,
            &self.deck_source,
            out,
        ))
    }

    /// Room the player currently sits in.
    pub fn room_of(&self, id: &PlayerId) -> Option<RoomCode> {
        self.players
            .get(id)
            .map(|p| p.room_code.clone())
            .filter(|code| self.games.contains(code))
    }

    /// Removes games past their TTL together with their players.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<RoomCode> {
        let expired = self.games.expired(now, self.config.room_ttl());
        for code in &expired {
            self.games.remove(code);
            let removed = self.players.remove_room(code);
            log::info!("Room {code} expired, removed {removed} player(s)");
        }
        expired
    }
}
