//! Player seats and participant fan-out
//!
//! A game room has exactly two seats, one per [`Role`]. This module keeps the
//! seated [`Player`] records, the index from participant [`Id`] to seat, and
//! the helpers used to push messages to whoever is currently connected.

use std::{collections::HashMap, fmt::Display, str::FromStr};

use enum_map::{Enum, EnumMap};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

use super::{SyncMessage, UpdateMessage, session::Tunnel};

/// A unique identifier for a connected participant
///
/// The host assigns one per connection and keeps it across reconnection, so
/// a returning player recovers the same seat.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random participant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses an ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// The seat a player occupies in a game room
///
/// P1 is the proposer, P2 the responder. Roles are handed out in join order
/// and never change for the lifetime of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum Role {
    /// First player to join; proposes offers
    P1,
    /// Second player to join; answers offers
    P2,
}

impl Role {
    /// The opposite seat
    pub fn other(self) -> Self {
        match self {
            Self::P1 => Self::P2,
            Self::P2 => Self::P1,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P1 => write!(f, "P1"),
            Self::P2 => write!(f, "P2"),
        }
    }
}

/// A bundle of the two token types
///
/// Used both for a player's holdings and for the amounts of an offer.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::AddAssign,
)]
#[serde(rename_all = "camelCase")]
pub struct Tokens {
    /// Amount of token type A
    pub token_a: u32,
    /// Amount of token type B
    pub token_b: u32,
}

impl Tokens {
    /// Creates a bundle from its two amounts
    pub const fn new(token_a: u32, token_b: u32) -> Self {
        Self { token_a, token_b }
    }

    /// Whether these holdings are enough to pay `amount`
    pub fn covers(&self, amount: Tokens) -> bool {
        self.token_a >= amount.token_a && self.token_b >= amount.token_b
    }

    /// Subtracts `amount`, or returns `None` when it is not covered
    pub fn checked_sub(self, amount: Tokens) -> Option<Tokens> {
        Some(Tokens {
            token_a: self.token_a.checked_sub(amount.token_a)?,
            token_b: self.token_b.checked_sub(amount.token_b)?,
        })
    }

    /// Total number of tokens across both types
    pub fn total(&self) -> u64 {
        u64::from(self.token_a) + u64::from(self.token_b)
    }
}

/// A seated player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Participant id of the connection owning the seat
    pub id: Id,
    /// Display name handed over by the lobby
    pub name: String,
    /// Display colour handed over by the lobby
    pub color: String,
    /// Seat occupied by this player
    pub role: Role,
    /// Current holdings
    #[serde(flatten)]
    pub tokens: Tokens,
    /// Shame tokens received after snatching in variant G3
    pub shame_tokens: u32,
    /// Whether the participant's connection is currently up
    pub connected: bool,
}

impl Player {
    fn new(id: Id, name: String, color: String, role: Role) -> Self {
        Self {
            id,
            name,
            color,
            role,
            tokens: Tokens::default(),
            shame_tokens: 0,
            connected: true,
        }
    }
}

/// Errors that can occur when seating a player
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Both seats are taken
    #[error("room is full")]
    Full,
    /// The participant already holds a seat
    #[error("participant is already seated")]
    AlreadySeated,
}

/// The two seats of a game room
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(from = "PlayersSerde")]
pub struct Players {
    /// Seat contents by role
    seats: EnumMap<Role, Option<Player>>,

    /// Reverse mapping from participant id to seat (not serialized)
    #[serde(skip_serializing)]
    roles: HashMap<Id, Role>,
}

/// Serialization helper for Players struct
#[derive(Deserialize)]
struct PlayersSerde {
    seats: EnumMap<Role, Option<Player>>,
}

impl From<PlayersSerde> for Players {
    fn from(serde: PlayersSerde) -> Self {
        let PlayersSerde { seats } = serde;
        let roles = seats
            .iter()
            .filter_map(|(role, seat)| seat.as_ref().map(|p| (p.id, role)))
            .collect();
        Self { seats, roles }
    }
}

impl Players {
    /// Seats a participant in the first free seat
    ///
    /// # Errors
    ///
    /// * `Error::AlreadySeated` - the participant already holds a seat
    /// * `Error::Full` - both seats are taken
    pub fn seat(&mut self, id: Id, name: String, color: String) -> Result<Role, Error> {
        if self.roles.contains_key(&id) {
            return Err(Error::AlreadySeated);
        }
        let role = self
            .seats
            .iter()
            .find_map(|(role, seat)| seat.is_none().then_some(role))
            .ok_or(Error::Full)?;

        self.seats[role] = Some(Player::new(id, name, color, role));
        self.roles.insert(id, role);

        Ok(role)
    }

    /// Number of occupied seats
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Whether no seat is occupied
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Whether both seats are occupied
    pub fn is_full(&self) -> bool {
        self.len() >= crate::constants::room::MAX_PLAYERS
    }

    /// Number of seated players with a live connection
    pub fn connected_count(&self) -> usize {
        self.iter().filter(|p| p.connected).count()
    }

    /// Seat of a participant, if seated
    pub fn role_of(&self, id: Id) -> Option<Role> {
        self.roles.get(&id).copied()
    }

    /// Player record of a participant
    pub fn get(&self, id: Id) -> Option<&Player> {
        self.role_of(id).and_then(|role| self.by_role(role))
    }

    /// Mutable player record of a participant
    pub fn get_mut(&mut self, id: Id) -> Option<&mut Player> {
        let role = self.role_of(id)?;
        self.by_role_mut(role)
    }

    /// Player holding a seat
    pub fn by_role(&self, role: Role) -> Option<&Player> {
        self.seats[role].as_ref()
    }

    /// Mutable player holding a seat
    pub fn by_role_mut(&mut self, role: Role) -> Option<&mut Player> {
        self.seats[role].as_mut()
    }

    /// Current holdings of a seat
    pub fn holdings(&self, role: Role) -> Option<Tokens> {
        self.by_role(role).map(|p| p.tokens)
    }

    /// Seated players in seat order (P1 first)
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.seats.values().flatten()
    }

    /// Mutable seated players in seat order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.seats.values_mut().flatten()
    }

    /// Moves `amount` from one seat to the other
    ///
    /// Nothing moves when either seat is empty or `from` cannot cover the
    /// whole amount.
    ///
    /// # Returns
    ///
    /// `true` if the tokens moved
    pub fn transfer(&mut self, from: Role, to: Role, amount: Tokens) -> bool {
        if from == to || self.seats[to].is_none() {
            return false;
        }
        let Some(payer) = self.seats[from].as_mut() else {
            return false;
        };
        let Some(rest) = payer.tokens.checked_sub(amount) else {
            return false;
        };
        payer.tokens = rest;
        if let Some(payee) = self.seats[to].as_mut() {
            payee.tokens += amount;
        }
        true
    }

    /// Overwrites every seated player's holdings and clears shame tokens
    pub fn reset_balances<F: Fn(Role) -> Tokens>(&mut self, stock: F) {
        for player in self.iter_mut() {
            player.tokens = stock(player.role);
            player.shame_tokens = 0;
        }
    }

    /// Marks a participant connected or disconnected
    ///
    /// # Returns
    ///
    /// The previous flag, or `None` if the participant is not seated
    pub fn set_connected(&mut self, id: Id, connected: bool) -> Option<bool> {
        let player = self.get_mut(id)?;
        Some(std::mem::replace(&mut player.connected, connected))
    }

    /// Connected players together with their tunnels, in seat order
    pub fn connected_vec<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        tunnel_finder: F,
    ) -> Vec<(Id, T, Role)> {
        self.iter()
            .filter(|p| p.connected)
            .filter_map(|p| tunnel_finder(p.id).map(|t| (p.id, t, p.role)))
            .collect_vec()
    }

    /// Sends an update message to one participant
    pub fn send_message<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &UpdateMessage,
        id: Id,
        tunnel_finder: F,
    ) {
        let Some(session) = tunnel_finder(id) else {
            return;
        };

        session.send_message(message);
    }

    /// Sends a state message to one participant
    pub fn send_state<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &SyncMessage,
        id: Id,
        tunnel_finder: F,
    ) {
        let Some(session) = tunnel_finder(id) else {
            return;
        };

        session.send_state(message);
    }

    /// Sends an update message to every connected player
    pub fn announce<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &UpdateMessage,
        tunnel_finder: F,
    ) {
        for (_, session, _) in self.connected_vec(tunnel_finder) {
            session.send_message(message);
        }
    }

    /// Sends a state message to every connected player
    pub fn announce_state<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &SyncMessage,
        tunnel_finder: F,
    ) {
        for (_, session, _) in self.connected_vec(tunnel_finder) {
            session.send_state(message);
        }
    }

    /// Closes a participant's tunnel if it is still open
    pub fn close_session<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, id: Id, tunnel_finder: F) {
        if let Some(session) = tunnel_finder(id) {
            session.close();
        }
    }
}
