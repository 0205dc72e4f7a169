//! Lobby and matchmaking
//!
//! The lobby gives every connected participant a unique display name and a
//! colour, shows the rooms that still have a free seat, and routes members
//! into a room through a [`RoomDirectory`]. It only hands out room ids; the
//! client then connects to the room itself.

use std::collections::HashMap;

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    TruncatedVec, constants,
    names::{NameStyle, SharedNames},
    player::Id,
    room::Status,
    room_id::RoomId,
    session::Tunnel,
};

/// What a room directory tells the lobby about one room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListing {
    /// Room code
    pub room_id: RoomId,
    /// Seated players
    pub player_count: usize,
    /// Room status
    pub status: Status,
    /// Whether the room refuses new players
    pub locked: bool,
}

impl RoomListing {
    /// Whether a lobby member may be sent to this room
    pub fn is_open(&self) -> bool {
        !self.locked && self.player_count < constants::room::MAX_PLAYERS
    }
}

/// Failures of the room directory
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DirectoryError {
    /// The directory could not be reached
    #[error("room directory unavailable")]
    Unavailable,
    /// The directory refused to create a room
    #[error("room could not be created: {0}")]
    CreateFailed(String),
}

/// Room discovery and creation
///
/// Implemented by whatever keeps track of the live rooms; the lobby never
/// owns rooms itself.
pub trait RoomDirectory {
    /// Every room the directory knows about
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] if the directory cannot answer.
    fn open_rooms(&self) -> Result<Vec<RoomListing>, DirectoryError>;

    /// One room by id, `None` if it does not exist
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] if the directory cannot answer.
    fn find(&self, room_id: RoomId) -> Result<Option<RoomListing>, DirectoryError>;

    /// Creates a fresh waiting room
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] if no room could be created.
    fn create_room(&mut self) -> Result<RoomId, DirectoryError>;
}

fn validate_color(value: &str) -> garde::Result {
    if is_hex_color(value) {
        Ok(())
    } else {
        Err(garde::Error::new("not a #rgb or #rrggbb colour"))
    }
}

/// Whether `value` is a `#rgb` or `#rrggbb` colour
pub fn is_hex_color(value: &str) -> bool {
    value.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

/// Lobby settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Generate guest names in this style instead of `guest`, `guest-2`, ...
    #[garde(dive)]
    pub random_names: Option<NameStyle>,
    /// Colour given to new members
    #[garde(custom(|v, _| validate_color(v)))]
    pub default_color: String,
    /// Number of open rooms shown to members
    #[garde(range(min = 1, max = 100))]
    pub listing_limit: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            random_names: None,
            default_color: constants::lobby::DEFAULT_COLOR.to_owned(),
            listing_limit: constants::lobby::DEFAULT_LISTING_LIMIT,
        }
    }
}

/// Messages lobby members send
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum IncomingMessage {
    /// Pick a new display name
    SetName(String),
    /// Pick a new colour
    SetColor(String),
    /// Join any open room, creating one if needed
    QuickPlay,
    /// Join a specific room
    JoinRoom(RoomId),
    /// Ask for the current room list
    RefreshRooms,
}

/// Notifications sent to lobby members
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UpdateMessage {
    /// Sent once on entering the lobby
    Welcome {
        /// Assigned display name
        name: String,
        /// Assigned colour
        color: String,
    },
    /// Display name changed
    NameUpdated {
        /// New display name
        name: String,
    },
    /// Colour changed
    ColorUpdated {
        /// New colour
        color: String,
    },
    /// The member should now connect to this room
    GameJoined {
        /// Room to connect to
        room_id: RoomId,
    },
    /// A request failed
    Error {
        /// Human readable reason
        message: String,
    },
    /// Rooms with a free seat
    AvailableRooms(TruncatedVec<RoomListing>),
}

/// Public view of a lobby member
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    /// Display name
    pub name: String,
    /// Colour
    pub color: String,
    /// Whether the member was sent to a room
    pub in_game: bool,
}

/// State sync messages sent to lobby members
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub enum SyncMessage {
    /// Everybody in the lobby
    Members(TruncatedVec<MemberView>),
}

/// One connected lobby member
#[derive(Debug, Clone)]
pub struct Member {
    /// Stable identifier the name is registered under
    pub identifier: String,
    /// Display name
    pub name: String,
    /// Colour
    pub color: String,
    /// Whether the member was sent to a room
    pub in_game: bool,
}

impl Member {
    fn view(&self) -> MemberView {
        MemberView {
            name: self.name.clone(),
            color: self.color.clone(),
            in_game: self.in_game,
        }
    }
}

/// The lobby
#[derive(Debug)]
pub struct Lobby {
    names: SharedNames,
    options: Options,
    members: HashMap<Id, Member>,
    /// Join order, for stable member lists
    order: Vec<Id>,
}

impl Lobby {
    /// Creates an empty lobby drawing names from `names`
    pub fn new(names: SharedNames, options: Options) -> Self {
        Self {
            names,
            options,
            members: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// A member by connection id
    pub fn member(&self, id: Id) -> Option<&Member> {
        self.members.get(&id)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether nobody is in the lobby
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn send<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        id: Id,
        message: UpdateMessage,
        tunnel_finder: F,
    ) {
        if let Some(session) = tunnel_finder(id) {
            session.send_message(&message.into());
        }
    }

    fn send_error<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        id: Id,
        message: &str,
        tunnel_finder: F,
    ) {
        self.send(
            id,
            UpdateMessage::Error {
                message: message.to_owned(),
            },
            tunnel_finder,
        );
    }

    fn sync_all<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, tunnel_finder: F) {
        let members = TruncatedVec::new(
            self.order
                .iter()
                .filter_map(|id| self.members.get(id))
                .map(Member::view),
            constants::lobby::MEMBER_LIST_LIMIT,
            self.members.len(),
        );
        let state = SyncMessage::Members(members).into();
        for session in self.order.iter().filter_map(|id| tunnel_finder(*id)) {
            session.send_state(&state);
        }
    }

    fn guest_base(&self) -> String {
        self.options
            .random_names
            .map(|style| style.get_name())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| constants::names::GUEST_BASE.to_owned())
    }

    /// Admits a participant
    ///
    /// `identifier` is the stable id the client keeps across connections; a
    /// returning identifier gets its previous name back. An empty identifier
    /// falls back to the connection id.
    pub fn join<T: Tunnel, F: Fn(Id) -> Option<T>, D: RoomDirectory + ?Sized>(
        &mut self,
        id: Id,
        identifier: &str,
        directory: &D,
        tunnel_finder: F,
    ) -> String {
        let identifier = if identifier.trim().is_empty() {
            id.to_string()
        } else {
            identifier.to_owned()
        };
        let name = self.names.assign(&identifier, &self.guest_base());
        let color = self.options.default_color.clone();

        info!(player = %id, name = %name, "member joined lobby");

        if self.members.contains_key(&id) {
            self.order.retain(|other| *other != id);
        }
        self.members.insert(
            id,
            Member {
                identifier,
                name: name.clone(),
                color: color.clone(),
                in_game: false,
            },
        );
        self.order.push(id);

        self.send(
            id,
            UpdateMessage::Welcome {
                name: name.clone(),
                color,
            },
            &tunnel_finder,
        );
        self.send_rooms(id, directory, &tunnel_finder);
        self.sync_all(&tunnel_finder);

        name
    }

    /// Removes a member; its registered name stays reserved
    pub fn leave<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, id: Id, tunnel_finder: F) {
        if self.members.remove(&id).is_none() {
            return;
        }
        self.order.retain(|other| *other != id);
        info!(player = %id, "member left lobby");
        self.sync_all(tunnel_finder);
    }

    fn send_rooms<T: Tunnel, F: Fn(Id) -> Option<T>, D: RoomDirectory + ?Sized>(
        &self,
        id: Id,
        directory: &D,
        tunnel_finder: F,
    ) {
        let rooms = match directory.open_rooms() {
            Ok(rooms) => rooms,
            Err(error) => {
                warn!(%error, "could not list rooms");
                return;
            }
        };
        let open = rooms.into_iter().filter(RoomListing::is_open).collect_vec();
        let count = open.len();
        self.send(
            id,
            UpdateMessage::AvailableRooms(TruncatedVec::new(
                open.into_iter(),
                self.options.listing_limit,
                count,
            )),
            tunnel_finder,
        );
    }

    fn quick_play<D: RoomDirectory + ?Sized>(directory: &mut D) -> Result<RoomId, DirectoryError> {
        let open = directory
            .open_rooms()?
            .into_iter()
            .find(RoomListing::is_open);
        match open {
            Some(listing) => Ok(listing.room_id),
            None => directory.create_room(),
        }
    }

    fn enter_room<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        id: Id,
        room_id: RoomId,
        tunnel_finder: F,
    ) {
        if let Some(member) = self.members.get_mut(&id) {
            member.in_game = true;
        }
        info!(player = %id, room = %room_id, "member sent to room");
        self.send(id, UpdateMessage::GameJoined { room_id }, &tunnel_finder);
        self.sync_all(&tunnel_finder);
    }

    /// Handles a message from a lobby member
    pub fn receive_message<T: Tunnel, F: Fn(Id) -> Option<T>, D: RoomDirectory + ?Sized>(
        &mut self,
        id: Id,
        message: IncomingMessage,
        directory: &mut D,
        tunnel_finder: F,
    ) {
        let Some(member) = self.members.get(&id) else {
            return;
        };
        let in_game = member.in_game;

        match message {
            IncomingMessage::SetName(requested) => {
                let Some(member) = self.members.get_mut(&id) else {
                    return;
                };
                let name = self.names.rename(&member.identifier, &requested);
                member.name.clone_from(&name);
                info!(player = %id, name = %name, "member renamed");
                self.send(id, UpdateMessage::NameUpdated { name }, &tunnel_finder);
                self.sync_all(&tunnel_finder);
            }
            IncomingMessage::SetColor(color) => {
                let color = color.trim().to_lowercase();
                if !is_hex_color(&color) {
                    self.send_error(id, "Invalid colour", &tunnel_finder);
                    return;
                }
                if let Some(member) = self.members.get_mut(&id) {
                    member.color.clone_from(&color);
                }
                self.send(id, UpdateMessage::ColorUpdated { color }, &tunnel_finder);
                self.sync_all(&tunnel_finder);
            }
            IncomingMessage::RefreshRooms => self.send_rooms(id, &*directory, &tunnel_finder),
            IncomingMessage::QuickPlay if !in_game => match Self::quick_play(directory) {
                Ok(room_id) => self.enter_room(id, room_id, &tunnel_finder),
                Err(error) => {
                    warn!(player = %id, %error, "quick play failed");
                    self.send_error(id, "Could not find or create a game room", &tunnel_finder);
                }
            },
            IncomingMessage::JoinRoom(room_id) if !in_game => match directory.find(room_id) {
                Ok(Some(listing)) if listing.is_open() => {
                    self.enter_room(id, room_id, &tunnel_finder);
                }
                Ok(_) => {
                    self.send_error(id, "Could not join the selected room", &tunnel_finder);
                }
                Err(error) => {
                    warn!(player = %id, room = %room_id, %error, "room lookup failed");
                    self.send_error(id, "Could not join the selected room", &tunnel_finder);
                }
            },
            IncomingMessage::QuickPlay | IncomingMessage::JoinRoom(_) => {}
        }
    }
}
