//! Game room controller
//!
//! A [`Room`] owns the state of one two-player game: the seats, the round
//! state machine and the room status. It is the only way messages reach the
//! state machine. Every method is synchronous and takes `&mut self`, so the
//! host processes one message per room at a time; rooms share nothing.
//!
//! The room never sleeps. Delayed work (reconnection windows, the grace
//! period before an admin restart, kick and dispose delays) is handed to the
//! host through a `schedule` callback and comes back through
//! [`Room::receive_alarm`]. Each alarm carries a token; an alarm whose token
//! was cancelled or replaced in the meantime is ignored.

use std::{collections::HashMap, fmt::Debug};

use garde::Validate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use web_time::{Duration, SystemTime};

use crate::{
    admin::{self, AdminCommand},
    constants,
    lobby::RoomListing,
    player::{self, Id, Player, Players, Role, Tokens},
    room_id::RoomId,
    round::{Rejection, Response, RoundState, Transition, Variant},
    session::Tunnel,
};

/// Lifecycle of a room
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Waiting for the second player (or for a restart to kick in)
    #[default]
    Waiting,
    /// Game in progress
    Playing,
    /// Game halted by a disconnect or an admin
    Paused,
    /// Last round resolved
    Finished,
}

/// Validation result type for duration validation
type ValidationResult = garde::Result;

/// Validates that a duration lies within `[MIN_MILLIS, MAX_MILLIS]`
fn validate_millis<const MIN_MILLIS: u64, const MAX_MILLIS: u64>(
    val: &Duration,
    _ctx: &(),
) -> ValidationResult {
    if (u128::from(MIN_MILLIS)..=u128::from(MAX_MILLIS)).contains(&val.as_millis()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_MILLIS}ms,{MAX_MILLIS}ms]",
        )))
    }
}

/// Tunable room settings
///
/// Missing fields fall back to their defaults when deserialized.
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Stock of token A given to P1 and of token B given to P2 at game start
    #[garde(range(
        min = constants::room::MIN_STARTING_TOKENS,
        max = constants::room::MAX_STARTING_TOKENS
    ))]
    pub starting_tokens: u32,
    /// Variant new rooms start with
    #[garde(skip)]
    pub default_variant: Variant,
    /// How long a disconnected player may take to come back
    #[garde(custom(validate_millis::<
        { constants::timing::MIN_RECONNECT_WINDOW },
        { constants::timing::MAX_RECONNECT_WINDOW }
    >))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub reconnect_window: Duration,
    /// Pause between an admin restart and the new game
    #[garde(custom(validate_millis::<0, { constants::timing::MAX_RESTART_GRACE }>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub restart_grace: Duration,
    /// Pause between the kick notice and the disconnect
    #[garde(custom(validate_millis::<0, { constants::timing::MAX_KICK_DELAY }>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub kick_delay: Duration,
    /// Pause between the lobby notice and disposal
    #[garde(custom(validate_millis::<0, { constants::timing::MAX_LOBBY_DISPOSE_DELAY }>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub lobby_dispose_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            starting_tokens: constants::room::DEFAULT_STARTING_TOKENS,
            default_variant: Variant::default(),
            reconnect_window: Duration::from_millis(constants::timing::DEFAULT_RECONNECT_WINDOW),
            restart_grace: Duration::from_millis(constants::timing::DEFAULT_RESTART_GRACE),
            kick_delay: Duration::from_millis(constants::timing::DEFAULT_KICK_DELAY),
            lobby_dispose_delay: Duration::from_millis(
                constants::timing::DEFAULT_LOBBY_DISPOSE_DELAY,
            ),
        }
    }
}

/// Offer amounts as sent by the client
///
/// Amounts arrive as JSON numbers; negative, fractional or missing values
/// are floored and clamped to zero.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Proposal {
    /// Token A offered by P1
    pub offer_a: f64,
    /// Token B offered by P1
    pub offer_b: f64,
    /// Token A requested from P2
    pub request_a: f64,
    /// Token B requested from P2
    pub request_b: f64,
}

fn clamp_amount(raw: f64) -> u32 {
    if raw.is_finite() && raw > 0. {
        raw.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

impl Proposal {
    /// Tokens P1 offers
    pub fn offered(&self) -> Tokens {
        Tokens::new(clamp_amount(self.offer_a), clamp_amount(self.offer_b))
    }

    /// Tokens P1 requests
    pub fn requested(&self) -> Tokens {
        Tokens::new(clamp_amount(self.request_a), clamp_amount(self.request_b))
    }
}

/// Chat text as sent by the client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatPayload {
    /// Message text
    pub text: String,
    /// Client-chosen message id
    pub id: Option<String>,
}

/// Messages players send to their room
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum IncomingMessage {
    /// P1 proposes a trade
    ProposeOffer(Proposal),
    /// P1 declines to offer this round
    NoOffer,
    /// P2 forces (or releases) an offer
    P2Force(bool),
    /// P2 answers the offer
    P2Action(Response),
    /// P1 reports a snatch (G4)
    Report(bool),
    /// P1 assigns a shame token (G3)
    AssignShame(bool),
    /// Either player switches the variant
    SetVariant(Variant),
    /// Non-binding chat
    Chat(ChatPayload),
}

/// A chat line as broadcast to the room
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message id
    pub id: String,
    /// Message text, cut to the chat length limit
    pub text: String,
    /// Sender's display name
    pub from: String,
    /// Sender's participant id
    pub from_id: Id,
    /// Milliseconds since the Unix epoch
    pub ts: u64,
}

/// Event notifications sent to players
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UpdateMessage {
    /// Sent to a player once seated (and again on reconnection)
    PlayerInfo {
        /// Participant id
        id: Id,
        /// Display name
        name: String,
        /// Seat
        role: Role,
        /// Room the player is in
        room_id: RoomId,
    },
    /// Both seats taken, round 1 begins
    GameStart,
    /// Game halted
    GamePaused,
    /// Game continues
    GameResumed,
    /// Admin reset the room
    GameRestart,
    /// Last round resolved
    GameEnd,
    /// Rule set switched, back to round 1
    VariantChanged {
        /// New variant
        variant: Variant,
    },
    /// A new round began
    RoundStarted {
        /// The new round number
        round: u8,
    },
    /// Chat line
    Chat(ChatMessage),
    /// The recipient is about to be disconnected by an admin
    AdminKicked,
    /// The room is closing; go back to the lobby
    ReturnToLobby,
}

/// Full public view of a room
///
/// Also the answer to the admin `getState` query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// Room code
    pub room_id: RoomId,
    /// Seated players in seat order
    pub players: Vec<Player>,
    /// Room status
    pub status: Status,
    /// Active variant
    pub variant: Variant,
    /// Current round
    pub round: u8,
    /// Decisions and offer of the current round
    pub decisions: RoundState,
}

/// State sync messages sent to players
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum SyncMessage {
    /// Current public state of the room
    Table(RoomSnapshot),
}

/// Timers a room can have outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TimerKey {
    Reconnect(Id),
    Kick(Id),
    Restart,
    Dispose,
}

/// Delayed events handed to the host and delivered back to the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// A player's reconnection window closes
    ReconnectExpired {
        /// The disconnected player
        player: Id,
        /// Timer token
        token: u64,
    },
    /// Start the game again after an admin restart
    Restart {
        /// Timer token
        token: u64,
    },
    /// Disconnect a kicked player
    Kick {
        /// The kicked player
        player: Id,
        /// Timer token
        token: u64,
    },
    /// Close every connection and dispose the room
    Dispose {
        /// Timer token
        token: u64,
    },
}

impl AlarmMessage {
    fn new(key: TimerKey, token: u64) -> Self {
        match key {
            TimerKey::Reconnect(player) => Self::ReconnectExpired { player, token },
            TimerKey::Kick(player) => Self::Kick { player, token },
            TimerKey::Restart => Self::Restart { token },
            TimerKey::Dispose => Self::Dispose { token },
        }
    }

    fn key(&self) -> (TimerKey, u64) {
        match *self {
            Self::ReconnectExpired { player, token } => (TimerKey::Reconnect(player), token),
            Self::Kick { player, token } => (TimerKey::Kick(player), token),
            Self::Restart { token } => (TimerKey::Restart, token),
            Self::Dispose { token } => (TimerKey::Dispose, token),
        }
    }
}

/// Outstanding fire-once timers
///
/// Arming a key replaces the previous timer of that key.
#[derive(Debug, Default)]
struct Timers {
    next_token: u64,
    live: HashMap<TimerKey, u64>,
}

impl Timers {
    fn arm(&mut self, key: TimerKey) -> u64 {
        self.next_token += 1;
        self.live.insert(key, self.next_token);
        self.next_token
    }

    fn cancel(&mut self, key: TimerKey) -> bool {
        self.live.remove(&key).is_some()
    }

    fn is_armed(&self, key: TimerKey) -> bool {
        self.live.contains_key(&key)
    }

    fn fire(&mut self, key: TimerKey, token: u64) -> bool {
        if self.live.get(&key) == Some(&token) {
            self.live.remove(&key);
            true
        } else {
            false
        }
    }

    fn cancel_all(&mut self) {
        self.live.clear();
    }

    fn len(&self) -> usize {
        self.live.len()
    }
}

/// Reasons a participant cannot join a room
#[derive(thiserror::Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// Both seats are taken
    #[error("room is full")]
    Full,
    /// The game already started
    #[error("game already in progress")]
    NotWaiting,
    /// The participant is already seated here
    #[error("already in this room")]
    AlreadySeated,
    /// The room was torn down
    #[error("room no longer exists")]
    Disposed,
}

/// Reasons a participant cannot resume a seat
#[derive(thiserror::Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectError {
    /// The participant holds no seat here
    #[error("unknown participant")]
    Unknown,
    /// The participant never left
    #[error("participant is still connected")]
    AlreadyConnected,
    /// The reconnection window closed
    #[error("reconnection window expired")]
    Expired,
}

/// One game room
pub struct Room {
    /// Room code
    id: RoomId,
    /// Tunables
    options: Options,
    /// Lifecycle status
    status: Status,
    /// The two seats
    players: Players,
    /// Round state machine
    round: RoundState,
    /// Outstanding timers
    timers: Timers,
    /// Whether the room was torn down
    disposed: bool,
}

impl Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("round", &self.round.round)
            .finish_non_exhaustive()
    }
}

// Convenience methods
impl Room {
    /// Room code
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Current status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Seated players
    pub fn players(&self) -> &Players {
        &self.players
    }

    /// Round state
    pub fn round(&self) -> &RoundState {
        &self.round
    }

    /// Whether [`Room::dispose`] ran
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Number of timers still outstanding
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Whether a new participant could take a seat
    pub fn is_joinable(&self) -> bool {
        !self.disposed && self.status == Status::Waiting && !self.players.is_full()
    }

    /// Summary used by room directories
    pub fn listing(&self) -> RoomListing {
        RoomListing {
            room_id: self.id,
            player_count: self.players.len(),
            status: self.status,
            locked: !self.is_joinable(),
        }
    }

    /// Full public view of the room
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id,
            players: self.players.iter().cloned().collect(),
            status: self.status,
            variant: self.round.variant,
            round: self.round.round,
            decisions: self.round.clone(),
        }
    }

    fn starting_stock(&self, role: Role) -> Tokens {
        let stock = self.options.starting_tokens;
        match role {
            Role::P1 => Tokens::new(stock, 0),
            Role::P2 => Tokens::new(0, stock),
        }
    }

    fn arm<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        key: TimerKey,
        delay: Duration,
        schedule: &mut S,
    ) {
        let token = self.timers.arm(key);
        schedule(AlarmMessage::new(key, token).into(), delay);
    }

    /// Sends the current public state to one participant
    pub fn sync<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, id: Id, tunnel_finder: F) {
        self.players.send_state(
            &SyncMessage::Table(self.snapshot()).into(),
            id,
            tunnel_finder,
        );
    }

    /// Sends the current public state to every connected player
    fn sync_all<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, tunnel_finder: F) {
        self.players
            .announce_state(&SyncMessage::Table(self.snapshot()).into(), tunnel_finder);
    }

    fn announce<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, message: UpdateMessage, tunnel_finder: F) {
        self.players.announce(&message.into(), tunnel_finder);
    }

    fn send_player_info<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, id: Id, tunnel_finder: F) {
        let Some(player) = self.players.get(id) else {
            return;
        };
        self.players.send_message(
            &UpdateMessage::PlayerInfo {
                id,
                name: player.name.clone(),
                role: player.role,
                room_id: self.id,
            }
            .into(),
            id,
            tunnel_finder,
        );
    }
}

impl Room {
    /// Creates an empty room in the `Waiting` status
    pub fn new(id: RoomId, options: Options) -> Self {
        Self {
            id,
            options,
            status: Status::Waiting,
            players: Players::default(),
            round: RoundState::new(options.default_variant),
            timers: Timers::default(),
            disposed: false,
        }
    }

    /// Seats a participant
    ///
    /// The first participant becomes P1, the second P2. The second join
    /// starts the game.
    ///
    /// # Errors
    ///
    /// * `JoinError::Disposed` - the room was torn down
    /// * `JoinError::Full` - both seats are taken
    /// * `JoinError::NotWaiting` - the game already started
    /// * `JoinError::AlreadySeated` - the participant is already seated
    pub fn join<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        id: Id,
        name: &str,
        color: &str,
        tunnel_finder: F,
    ) -> Result<Role, JoinError> {
        if self.disposed {
            return Err(JoinError::Disposed);
        }
        if self.players.is_full() {
            return Err(JoinError::Full);
        }
        if self.status != Status::Waiting {
            return Err(JoinError::NotWaiting);
        }

        let name = if name.trim().is_empty() {
            constants::names::DEFAULT_BASE
        } else {
            name
        };
        let role = self
            .players
            .seat(id, name.to_owned(), color.to_owned())
            .map_err(|e| match e {
                player::Error::Full => JoinError::Full,
                player::Error::AlreadySeated => JoinError::AlreadySeated,
            })?;

        info!(room = %self.id, player = %id, %role, name, "player joined");

        self.send_player_info(id, &tunnel_finder);

        if self.players.is_full() {
            self.start_game(&tunnel_finder);
        } else {
            self.sync_all(&tunnel_finder);
        }

        Ok(role)
    }

    /// Handles a dropped connection
    ///
    /// Pauses a running game and opens the reconnection window.
    pub fn leave<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        id: Id,
        mut schedule: S,
        tunnel_finder: F,
    ) {
        if self.disposed {
            return;
        }
        if self.players.set_connected(id, false) != Some(true) {
            return;
        }

        info!(room = %self.id, player = %id, "player disconnected");

        if self.status == Status::Playing
            && self.players.connected_count() < constants::room::MAX_PLAYERS
        {
            self.pause_game(&tunnel_finder);
        }

        // a pending kick forfeits the seat
        if !self.timers.is_armed(TimerKey::Kick(id)) {
            self.arm(
                TimerKey::Reconnect(id),
                self.options.reconnect_window,
                &mut schedule,
            );
        }

        self.sync_all(&tunnel_finder);
    }

    /// Gives a disconnected player their seat back
    ///
    /// Resumes a paused game once both players are connected again.
    ///
    /// # Errors
    ///
    /// * `ReconnectError::Unknown` - no seat for this participant
    /// * `ReconnectError::AlreadyConnected` - the participant never left
    /// * `ReconnectError::Expired` - the reconnection window closed
    pub fn reconnect<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        id: Id,
        tunnel_finder: F,
    ) -> Result<Role, ReconnectError> {
        let Some(player) = self.players.get(id).filter(|_| !self.disposed) else {
            return Err(ReconnectError::Unknown);
        };
        if player.connected {
            return Err(ReconnectError::AlreadyConnected);
        }
        let role = player.role;
        if !self.timers.cancel(TimerKey::Reconnect(id)) {
            return Err(ReconnectError::Expired);
        }

        self.players.set_connected(id, true);
        info!(room = %self.id, player = %id, %role, "player reconnected");

        self.send_player_info(id, &tunnel_finder);

        if self.status == Status::Paused
            && self.players.connected_count() == constants::room::MAX_PLAYERS
        {
            self.resume_game(&tunnel_finder);
        }

        self.sync_all(&tunnel_finder);

        Ok(role)
    }

    /// Tears the room down
    ///
    /// Cancels every outstanding timer; later alarms and messages are
    /// ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.timers.cancel_all();
        self.disposed = true;
        info!(room = %self.id, "room disposed");
    }

    fn start_game<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, tunnel_finder: F) {
        self.status = Status::Playing;
        let p1 = self.starting_stock(Role::P1);
        let p2 = self.starting_stock(Role::P2);
        self.players.reset_balances(|role| match role {
            Role::P1 => p1,
            Role::P2 => p2,
        });
        self.round = RoundState::new(self.round.variant);

        info!(room = %self.id, variant = %self.round.variant, "game started");
        self.announce(UpdateMessage::GameStart, &tunnel_finder);

        if self.players.connected_count() < constants::room::MAX_PLAYERS {
            self.pause_game(&tunnel_finder);
        }

        self.sync_all(&tunnel_finder);
    }

    fn pause_game<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, tunnel_finder: F) {
        if self.status != Status::Playing {
            return;
        }
        self.status = Status::Paused;
        info!(room = %self.id, "game paused");
        self.announce(UpdateMessage::GamePaused, tunnel_finder);
    }

    fn resume_game<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, tunnel_finder: F) {
        if self.status != Status::Paused {
            return;
        }
        self.status = Status::Playing;
        info!(room = %self.id, "game resumed");
        self.announce(UpdateMessage::GameResumed, tunnel_finder);
    }

    fn apply_transition<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        transition: Transition,
        tunnel_finder: F,
    ) {
        match transition {
            Transition::Stay => {}
            Transition::NextRound(round) => {
                debug!(room = %self.id, round, "round started");
                self.announce(UpdateMessage::RoundStarted { round }, tunnel_finder);
            }
            Transition::Finished => {
                self.status = Status::Finished;
                info!(room = %self.id, variant = %self.round.variant, "game ended");
                self.announce(UpdateMessage::GameEnd, tunnel_finder);
            }
        }
    }

    fn restart<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        schedule: &mut S,
        tunnel_finder: F,
    ) {
        self.timers.cancel(TimerKey::Restart);

        self.status = Status::Waiting;
        self.round = RoundState::new(self.round.variant);
        self.players.reset_balances(|_| Tokens::default());

        info!(room = %self.id, "game restarted");
        self.announce(UpdateMessage::GameRestart, &tunnel_finder);
        self.sync_all(&tunnel_finder);

        if self.players.is_full() {
            self.arm(TimerKey::Restart, self.options.restart_grace, schedule);
        }
    }

    fn change_variant<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        variant: Variant,
        schedule: &mut S,
        tunnel_finder: F,
    ) {
        self.round.set_variant(variant);
        if self.status == Status::Finished {
            self.status = Status::Playing;
        }

        info!(room = %self.id, %variant, "variant changed");
        self.announce(UpdateMessage::VariantChanged { variant }, &tunnel_finder);
        self.sync_all(&tunnel_finder);

        if self.timers.cancel(TimerKey::Restart) {
            self.arm(TimerKey::Restart, self.options.restart_grace, schedule);
        }
    }

    fn chat<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        sender: Id,
        payload: ChatPayload,
        tunnel_finder: F,
    ) {
        let text: String = payload
            .text
            .chars()
            .take(constants::chat::MAX_LENGTH)
            .collect();
        if text.trim().is_empty() {
            return;
        }
        let Some(player) = self.players.get(sender) else {
            return;
        };

        let ts = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let id = payload
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("{ts}-{sender}"));

        self.announce(
            UpdateMessage::Chat(ChatMessage {
                id,
                text,
                from: player.name.clone(),
                from_id: sender,
                ts,
            }),
            tunnel_finder,
        );
    }

    /// Handles a message from a seated player
    ///
    /// Illegal moves are dropped without a reply; the sender only sees that
    /// the state did not change.
    pub fn receive_message<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        sender: Id,
        message: IncomingMessage,
        mut schedule: S,
        tunnel_finder: F,
    ) {
        if self.disposed {
            return;
        }
        let Some(role) = self
            .players
            .get(sender)
            .filter(|p| p.connected)
            .map(|p| p.role)
        else {
            return;
        };

        let result = match message {
            IncomingMessage::Chat(payload) => {
                self.chat(sender, payload, tunnel_finder);
                return;
            }
            IncomingMessage::SetVariant(variant) => {
                self.change_variant(variant, &mut schedule, tunnel_finder);
                return;
            }
            _ if self.status != Status::Playing => Err(Rejection::WrongPhase),
            IncomingMessage::ProposeOffer(proposal) => self.round.propose(
                &self.players,
                role,
                proposal.offered(),
                proposal.requested(),
            ),
            IncomingMessage::NoOffer => self.round.decline(role),
            IncomingMessage::P2Force(forced) => self.round.set_forced(role, forced),
            IncomingMessage::P2Action(response) => {
                self.round.respond(&mut self.players, role, response)
            }
            IncomingMessage::Report(report) => self.round.report(&mut self.players, role, report),
            IncomingMessage::AssignShame(assign) => {
                self.round.assign_shame(&mut self.players, role, assign)
            }
        };

        match result {
            Ok(transition) => {
                self.apply_transition(transition, &tunnel_finder);
                self.sync_all(&tunnel_finder);
            }
            Err(rejection) => {
                debug!(room = %self.id, player = %sender, %role, %rejection, "move ignored");
            }
        }
    }

    /// Handles an alarm previously handed to `schedule`
    ///
    /// Alarms that were cancelled, replaced or already delivered are ignored.
    pub fn receive_alarm<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        message: crate::AlarmMessage,
        tunnel_finder: F,
    ) {
        let crate::AlarmMessage::Room(alarm) = message;
        if self.disposed {
            return;
        }
        let (key, token) = alarm.key();
        if !self.timers.fire(key, token) {
            return;
        }

        match alarm {
            AlarmMessage::ReconnectExpired { player, .. } => {
                warn!(room = %self.id, %player, "reconnection window expired");
            }
            AlarmMessage::Restart { .. } => {
                if self.status == Status::Waiting && self.players.is_full() {
                    self.start_game(tunnel_finder);
                }
            }
            AlarmMessage::Kick { player, .. } => {
                self.timers.cancel(TimerKey::Reconnect(player));
                self.players.set_connected(player, false);
                self.players.close_session(player, &tunnel_finder);
                info!(room = %self.id, %player, "player kicked");

                if self.status == Status::Playing
                    && self.players.connected_count() < constants::room::MAX_PLAYERS
                {
                    self.pause_game(&tunnel_finder);
                }
                self.sync_all(&tunnel_finder);
            }
            AlarmMessage::Dispose { .. } => {
                for player in self.players.iter() {
                    self.players.close_session(player.id, &tunnel_finder);
                }
                self.dispose();
            }
        }
    }

    /// Runs an out-of-band admin command
    ///
    /// # Errors
    ///
    /// * `admin::Error::Disposed` - the room was torn down
    /// * `admin::Error::UnknownParticipant` - the kick target holds no seat
    pub fn execute<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        command: AdminCommand,
        mut schedule: S,
        tunnel_finder: F,
    ) -> Result<(), admin::Error> {
        if self.disposed {
            return Err(admin::Error::Disposed);
        }

        match command {
            AdminCommand::Pause => {
                self.pause_game(&tunnel_finder);
                self.sync_all(&tunnel_finder);
            }
            AdminCommand::Resume => {
                self.resume_game(&tunnel_finder);
                self.sync_all(&tunnel_finder);
            }
            AdminCommand::Restart => self.restart(&mut schedule, tunnel_finder),
            AdminCommand::SetVariant(variant) => {
                self.change_variant(variant, &mut schedule, tunnel_finder);
            }
            AdminCommand::Kick(player) => {
                if self.players.get(player).is_none() {
                    return Err(admin::Error::UnknownParticipant(player));
                }
                info!(room = %self.id, %player, "kick requested");
                self.timers.cancel(TimerKey::Reconnect(player));
                self.players.send_message(
                    &UpdateMessage::AdminKicked.into(),
                    player,
                    &tunnel_finder,
                );
                self.arm(TimerKey::Kick(player), self.options.kick_delay, &mut schedule);
            }
            AdminCommand::SendToLobby => {
                info!(room = %self.id, "sending players back to the lobby");
                self.announce(UpdateMessage::ReturnToLobby, &tunnel_finder);
                self.arm(
                    TimerKey::Dispose,
                    self.options.lobby_dispose_delay,
                    &mut schedule,
                );
            }
        }

        Ok(())
    }
}
