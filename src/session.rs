//! Communication session management
//!
//! The crate never owns a socket. Every outbound message goes through a
//! [`Tunnel`] that the host looks up per participant, so the same room and
//! lobby logic runs over WebSockets, an in-process channel, or a test double.

use super::{SyncMessage, UpdateMessage};

/// Trait for sending messages to one connected participant
///
/// Implementations wrap whatever transport the host uses. A participant
/// without a live tunnel is treated as unreachable and simply skipped.
pub trait Tunnel {
    /// Sends an event notification (game started, round advanced, chat, ...)
    ///
    /// # Arguments
    ///
    /// * `message` - The update message to send
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a full view of the public state
    ///
    /// Sent after every state change and whenever a participant
    /// (re)connects.
    ///
    /// # Arguments
    ///
    /// * `state` - The synchronization message to send
    fn send_state(&self, state: &SyncMessage);

    /// Closes the underlying connection
    fn close(self);
}
