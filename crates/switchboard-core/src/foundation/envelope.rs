//! Outbound addressing.

use serde::{Deserialize, Serialize};

use crate::foundation::message::{Message, User};

/// Addressing metadata for an outbound message.
///
/// An envelope names the destination room and user, and the adapter that must
/// deliver the message. The adapter name is resolved against the dispatcher's
/// registry at send time, so an envelope built from one adapter's message can
/// be retargeted to another adapter (cross-adapter replies).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    user: User,
    room: String,
    adapter_name: String,
}

impl Envelope {
    /// Creates a new envelope.
    pub fn new(user: User, room: impl Into<String>, adapter_name: impl Into<String>) -> Self {
        Self {
            user,
            room: room.into(),
            adapter_name: adapter_name.into(),
        }
    }

    /// Builds the reply envelope for a message received by `adapter_name`.
    pub fn from_message(message: &Message, adapter_name: impl Into<String>) -> Self {
        Self::new(message.user().clone(), message.room(), adapter_name)
    }

    /// Returns a copy of this envelope addressed through another adapter.
    pub fn via(&self, adapter_name: impl Into<String>) -> Self {
        Self::new(self.user.clone(), self.room.clone(), adapter_name)
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_message_copies_addressing() {
        let msg = Message::text(User::new("u1").with_name("alice"), "ops", "deploy");
        let envelope = Envelope::from_message(&msg, "shell");

        assert_eq!(envelope.user().id, "u1");
        assert_eq!(envelope.room(), "ops");
        assert_eq!(envelope.adapter_name(), "shell");
    }

    #[test]
    fn test_via_only_changes_adapter() {
        let envelope = Envelope::new(User::new("u1"), "ops", "shell");
        let other = envelope.via("irc");

        assert_eq!(other.adapter_name(), "irc");
        assert_eq!(other.room(), envelope.room());
        assert_eq!(other.user(), envelope.user());
        assert_eq!(envelope.adapter_name(), "shell");
    }
}
