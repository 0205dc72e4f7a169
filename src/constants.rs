//! Configuration constants for the negotiation game
//!
//! This module contains the fixed limits and the defaults used throughout
//! the crate. Values that an operator may tune live in
//! [`crate::room::Options`] and [`crate::lobby::Options`]; the defaults for
//! those options are defined here.

/// Game room limits
pub mod room {
    /// Number of seats in a game room
    pub const MAX_PLAYERS: usize = 2;
    /// Number of rounds in one game
    pub const ROUND_COUNT: u8 = 3;
    /// Default token stock each role starts with
    pub const DEFAULT_STARTING_TOKENS: u32 = 10;
    /// Smallest configurable starting stock
    pub const MIN_STARTING_TOKENS: u32 = 1;
    /// Largest configurable starting stock
    pub const MAX_STARTING_TOKENS: u32 = 1000;
}

/// Timer delays, in milliseconds
pub mod timing {
    /// Default window for a disconnected player to come back
    pub const DEFAULT_RECONNECT_WINDOW: u64 = 30_000;
    /// Lower bound of the reconnection window
    pub const MIN_RECONNECT_WINDOW: u64 = 1_000;
    /// Upper bound of the reconnection window
    pub const MAX_RECONNECT_WINDOW: u64 = 600_000;

    /// Default pause between an admin restart and the new game
    pub const DEFAULT_RESTART_GRACE: u64 = 500;
    /// Upper bound of the restart grace delay
    pub const MAX_RESTART_GRACE: u64 = 10_000;

    /// Default delay between the kick notice and the disconnect
    pub const DEFAULT_KICK_DELAY: u64 = 1_000;
    /// Upper bound of the kick delay
    pub const MAX_KICK_DELAY: u64 = 10_000;

    /// Default delay between the lobby notice and room disposal
    pub const DEFAULT_LOBBY_DISPOSE_DELAY: u64 = 2_000;
    /// Upper bound of the lobby dispose delay
    pub const MAX_LOBBY_DISPOSE_DELAY: u64 = 30_000;
}

/// Chat limits
pub mod chat {
    /// Maximum length of a chat message in characters, longer text is cut
    pub const MAX_LENGTH: usize = 500;
}

/// Name registry configuration
pub mod names {
    /// Maximum length of a requested base name in characters
    pub const MAX_LENGTH: usize = 30;
    /// Base used when the requested name is empty or rejected
    pub const DEFAULT_BASE: &str = "player";
    /// Base given to lobby members before they pick a name
    pub const GUEST_BASE: &str = "guest";
}

/// Lobby configuration
pub mod lobby {
    /// Colour assigned to new lobby members
    pub const DEFAULT_COLOR: &str = "#667eea";
    /// Default number of open rooms listed to lobby members
    pub const DEFAULT_LISTING_LIMIT: usize = 20;
    /// Number of members shown in the lobby member list
    pub const MEMBER_LIST_LIMIT: usize = 50;
}
