//! Room code generation
//!
//! Game rooms are identified by short random codes shown to players in the
//! lobby room list. Codes are displayed in octal so that they are always
//! five digits long and contain no `8` or `9`.

use std::{fmt::Display, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

/// Smallest generated code (in octal: 10000)
const MIN_VALUE: u16 = 0o10_000;
/// One past the largest generated code (in octal: 100000)
const MAX_VALUE: u16 = 0o100_000;

/// Identifier of a game room
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(u16);

impl RoomId {
    /// Creates a new random room code
    pub fn new() -> Self {
        Self(fastrand::u16(MIN_VALUE..MAX_VALUE))
    }

    /// Creates a room code that does not collide with `taken`
    ///
    /// Tries a handful of random codes first, then walks the whole code
    /// space. `None` means every code is taken.
    pub fn unused<F: Fn(&RoomId) -> bool>(taken: F) -> Option<Self> {
        std::iter::repeat_with(Self::new)
            .take(64)
            .chain((MIN_VALUE..MAX_VALUE).map(Self))
            .find(|id| !taken(id))
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:05o}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = ParseIntError;

    /// Parses a room code from its octal form
    ///
    /// # Errors
    ///
    /// Returns a `ParseIntError` if the string is not an octal number that
    /// fits in 16 bits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(u16::from_str_radix(s.trim(), 8)?))
    }
}

impl Serialize for RoomId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D>(deserializer: D) -> Result<RoomId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RoomId::from_str(&s).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}
