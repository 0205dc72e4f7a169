//! Admin control surface
//!
//! Commands an operator issues to running rooms outside of the player
//! message flow, an in-process [`Rooms`] directory that owns the rooms and
//! routes those commands, and the pairing shuffle used to reseat everyone.

use std::collections::HashMap;

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use web_time::Duration;

use crate::{
    lobby::{DirectoryError, RoomDirectory, RoomListing},
    player::Id,
    room::{self, Room, RoomSnapshot},
    room_id::RoomId,
    round::Variant,
    session::Tunnel,
};

/// Out-of-band commands for one room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdminCommand {
    /// Halt a running game
    Pause,
    /// Continue a paused game
    Resume,
    /// Reset to Waiting and start again after a grace delay
    Restart,
    /// Switch the rule set
    SetVariant(Variant),
    /// Disconnect one participant
    Kick(Id),
    /// Send everybody back to the lobby and dispose the room
    SendToLobby,
}

/// Failures of admin commands
#[derive(thiserror::Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No such room
    #[error("room {0} not found")]
    RoomNotFound(RoomId),
    /// The kick target holds no seat in the room
    #[error("participant {0} is not in this room")]
    UnknownParticipant(Id),
    /// The room was torn down
    #[error("room has been disposed")]
    Disposed,
}

/// Every live room of this process
#[derive(Debug, Default)]
pub struct Rooms {
    options: room::Options,
    rooms: HashMap<RoomId, Room>,
}

impl Rooms {
    /// Creates an empty directory whose rooms use `options`
    ///
    /// # Errors
    ///
    /// Returns the validation report if `options` are out of bounds.
    pub fn new(options: room::Options) -> Result<Self, garde::Report> {
        options.validate()?;
        Ok(Self {
            options,
            rooms: HashMap::new(),
        })
    }

    /// Creates a waiting room under a fresh code
    ///
    /// Returns `None` when every room code is in use.
    pub fn open(&mut self) -> Option<RoomId> {
        let Some(id) = RoomId::unused(|id| self.rooms.contains_key(id)) else {
            warn!(rooms = self.rooms.len(), "no free room code");
            return None;
        };
        self.rooms.insert(id, Room::new(id, self.options));
        info!(room = %id, "room created");
        Some(id)
    }

    /// A room by code
    pub fn get(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.get(&room_id)
    }

    /// A room by code, for routing player messages and alarms
    pub fn get_mut(&mut self, room_id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&room_id)
    }

    /// Number of rooms, disposed ones included until [`Rooms::prune`]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether there are no rooms
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Runs an admin command against one room
    ///
    /// # Errors
    ///
    /// * `Error::RoomNotFound` - no room with this code
    /// * any error of [`Room::execute`]
    pub fn execute<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        room_id: RoomId,
        command: AdminCommand,
        schedule: S,
        tunnel_finder: F,
    ) -> Result<(), Error> {
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(Error::RoomNotFound(room_id))?;
        info!(room = %room_id, ?command, "admin command");
        room.execute(command, schedule, tunnel_finder)
    }

    /// Public state of one room
    ///
    /// # Errors
    ///
    /// Returns `Error::RoomNotFound` if there is no such room.
    pub fn state(&self, room_id: RoomId) -> Result<RoomSnapshot, Error> {
        self.rooms
            .get(&room_id)
            .map(Room::snapshot)
            .ok_or(Error::RoomNotFound(room_id))
    }

    /// Public state of every live room, ordered by code
    pub fn snapshots(&self) -> Vec<RoomSnapshot> {
        self.live().map(Room::snapshot).collect_vec()
    }

    /// Directory listing of every live room, ordered by code
    pub fn listings(&self) -> Vec<RoomListing> {
        self.live().map(Room::listing).collect_vec()
    }

    fn live(&self) -> impl Iterator<Item = &Room> {
        self.rooms
            .values()
            .filter(|room| !room.is_disposed())
            .sorted_by_key(|room| room.id())
    }

    /// Drops disposed rooms, returning how many were removed
    pub fn prune(&mut self) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, room| !room.is_disposed());
        before - self.rooms.len()
    }
}

impl RoomDirectory for Rooms {
    fn open_rooms(&self) -> Result<Vec<RoomListing>, DirectoryError> {
        Ok(self.listings())
    }

    fn find(&self, room_id: RoomId) -> Result<Option<RoomListing>, DirectoryError> {
        Ok(self
            .rooms
            .get(&room_id)
            .filter(|room| !room.is_disposed())
            .map(Room::listing))
    }

    fn create_room(&mut self) -> Result<RoomId, DirectoryError> {
        self.open()
            .ok_or_else(|| DirectoryError::CreateFailed("no free room code".to_owned()))
    }
}

/// A random reseating plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pairings {
    /// New pairs; the first of each pair is seated first and becomes P1
    pub pairs: Vec<[Id; 2]>,
    /// Left over when the number of participants is odd
    pub unpaired: Option<Id>,
}

/// Randomly pairs up `participants`
///
/// The plan only says who plays whom. Sending players back to the lobby,
/// clearing names with [`crate::names::SharedNames::reset`] and reseating
/// them is up to the caller.
pub fn shuffle_pairings(participants: &[Id]) -> Pairings {
    let mut shuffled = participants.iter().copied().unique().collect_vec();
    fastrand::shuffle(&mut shuffled);

    let chunks = shuffled.chunks_exact(2);
    let unpaired = chunks.remainder().first().copied();
    let pairs = chunks.map(|pair| [pair[0], pair[1]]).collect_vec();

    info!(pairs = pairs.len(), unpaired = unpaired.is_some(), "pairings shuffled");

    Pairings { pairs, unpaired }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::{cell::RefCell, collections::HashSet, rc::Rc};

    use super::*;
    use crate::room::Status;

    #[derive(Debug, Clone, Default)]
    struct MockTunnel {
        closed: Rc<RefCell<bool>>,
    }

    impl Tunnel for MockTunnel {
        fn send_message(&self, _message: &crate::UpdateMessage) {}

        fn send_state(&self, _state: &crate::SyncMessage) {}

        fn close(self) {
            *self.closed.borrow_mut() = true;
        }
    }

    fn seated_room(rooms: &mut Rooms, tunnels: &mut HashMap<Id, MockTunnel>) -> (RoomId, Id, Id) {
        let room_id = rooms.open().unwrap();
        let p1 = Id::new();
        let p2 = Id::new();
        tunnels.insert(p1, MockTunnel::default());
        tunnels.insert(p2, MockTunnel::default());
        let room = rooms.get_mut(room_id).unwrap();
        room.join(p1, "ana", "#fff", |id| tunnels.get(&id).cloned())
            .unwrap();
        room.join(p2, "bo", "#000", |id| tunnels.get(&id).cloned())
            .unwrap();
        (room_id, p1, p2)
    }

    #[test]
    fn test_invalid_options_are_refused() {
        let options = room::Options {
            starting_tokens: 0,
            ..room::Options::default()
        };
        assert!(Rooms::new(options).is_err());
        assert!(Rooms::new(room::Options::default()).is_ok());
    }

    #[test]
    fn test_execute_routes_to_room() {
        let mut rooms = Rooms::default();
        let mut tunnels = HashMap::new();
        let (room_id, _, _) = seated_room(&mut rooms, &mut tunnels);

        rooms
            .execute(
                room_id,
                AdminCommand::Pause,
                |_, _| {},
                |id| tunnels.get(&id).cloned(),
            )
            .unwrap();
        assert_eq!(rooms.state(room_id).unwrap().status, Status::Paused);
    }

    #[test]
    fn test_execute_on_missing_room() {
        let mut rooms = Rooms::default();
        let missing = RoomId::new();
        let result = rooms.execute(
            missing,
            AdminCommand::Resume,
            |_, _| {},
            |_| None::<MockTunnel>,
        );
        assert_eq!(result, Err(Error::RoomNotFound(missing)));
        assert_eq!(rooms.state(missing).unwrap_err(), Error::RoomNotFound(missing));
    }

    #[test]
    fn test_send_to_lobby_then_prune() {
        let mut rooms = Rooms::default();
        let mut tunnels = HashMap::new();
        let (room_id, p1, _) = seated_room(&mut rooms, &mut tunnels);
        let other = rooms.open().unwrap();

        let mut alarms = Vec::new();
        rooms
            .execute(
                room_id,
                AdminCommand::SendToLobby,
                |alarm, _| alarms.push(alarm),
                |id| tunnels.get(&id).cloned(),
            )
            .unwrap();
        assert_eq!(alarms.len(), 1);

        let room = rooms.get_mut(room_id).unwrap();
        room.receive_alarm(alarms[0], |id| tunnels.get(&id).cloned());
        assert!(*tunnels[&p1].closed.borrow());

        assert_eq!(rooms.listings().len(), 1);
        assert_eq!(rooms.find(room_id), Ok(None));
        assert_eq!(rooms.prune(), 1);
        assert_eq!(rooms.len(), 1);
        assert!(rooms.get(other).is_some());
    }

    #[test]
    fn test_directory_listing_and_creation() {
        let mut rooms = Rooms::default();
        let mut tunnels = HashMap::new();
        let (full, _, _) = seated_room(&mut rooms, &mut tunnels);
        let created = rooms.create_room().unwrap();

        let open = rooms
            .open_rooms()
            .unwrap()
            .into_iter()
            .filter(RoomListing::is_open)
            .collect_vec();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].room_id, created);
        assert!(rooms.find(full).unwrap().unwrap().locked);
    }

    #[test]
    fn test_open_never_replaces_a_live_room() {
        let mut rooms = Rooms::default();
        for code in 0o10_000..0o100_000u16 {
            let id: RoomId = format!("{code:o}").parse().unwrap();
            rooms.rooms.insert(id, Room::new(id, rooms.options));
        }
        let taken = rooms.len();

        assert_eq!(rooms.open(), None);
        assert_eq!(
            rooms.create_room(),
            Err(DirectoryError::CreateFailed("no free room code".to_owned()))
        );
        assert_eq!(rooms.len(), taken);

        let freed: RoomId = "54321".parse().unwrap();
        rooms.rooms.remove(&freed);
        assert_eq!(rooms.open(), Some(freed));
    }

    #[test]
    fn test_snapshots_are_ordered() {
        let mut rooms = Rooms::default();
        for _ in 0..5 {
            rooms.open().unwrap();
        }
        let ids = rooms.snapshots().iter().map(|s| s.room_id).collect_vec();
        assert_eq!(ids.len(), 5);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_command_wire_format() {
        let command: AdminCommand = serde_json::from_str(r#"{"setVariant":"G3"}"#).unwrap();
        assert_eq!(command, AdminCommand::SetVariant(Variant::G3));
        let command: AdminCommand = serde_json::from_str(r#""sendToLobby""#).unwrap();
        assert_eq!(command, AdminCommand::SendToLobby);
        let id = Id::new();
        let command: AdminCommand =
            serde_json::from_str(&format!(r#"{{"kick":"{id}"}}"#)).unwrap();
        assert_eq!(command, AdminCommand::Kick(id));
    }

    #[test]
    fn test_shuffle_pairs_everyone_once() {
        let participants = (0..7).map(|_| Id::new()).collect_vec();
        let plan = shuffle_pairings(&participants);

        assert_eq!(plan.pairs.len(), 3);
        let mut seen: HashSet<Id> = plan.pairs.iter().flatten().copied().collect();
        assert_eq!(seen.len(), 6);
        let left = plan.unpaired.unwrap();
        assert!(seen.insert(left));
        assert_eq!(seen, participants.into_iter().collect());
    }

    #[test]
    fn test_shuffle_even_and_empty() {
        let participants = (0..4).map(|_| Id::new()).collect_vec();
        let plan = shuffle_pairings(&participants);
        assert_eq!(plan.pairs.len(), 2);
        assert_eq!(plan.unpaired, None);

        let plan = shuffle_pairings(&[]);
        assert!(plan.pairs.is_empty());
        assert_eq!(plan.unpaired, None);
    }
}
