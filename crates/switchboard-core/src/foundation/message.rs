//! Inbound message model.
//!
//! Adapters translate platform events into one of the [`Message`] variants
//! before handing them to the dispatcher. A message is owned by the adapter
//! that produced it and is never mutated once created.
//!
//! ```text
//! Message
//! ├── Text(TextMessage)        chat text from a user in a room
//! ├── Enter(PresenceMessage)   a user joined a room
//! ├── Leave(PresenceMessage)   a user left a room
//! ├── Topic(TopicMessage)      the room topic changed
//! └── Unknown { kind, .. }     anything the adapter could not classify
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// User
// ============================================================================

/// Reference to a chat user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Backend-specific user identifier.
    pub id: String,
    /// Display name, when the backend provides one.
    #[serde(default)]
    pub name: Option<String>,
}

impl User {
    /// Creates a user with only an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the display name, falling back to the identifier.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Message variants
// ============================================================================

/// A chat line sent by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    /// Backend message identifier, if any.
    #[serde(default)]
    pub id: Option<String>,
    /// Sender.
    pub user: User,
    /// Room the message was posted in.
    pub room: String,
    /// Raw text.
    pub text: String,
}

impl TextMessage {
    /// Creates a text message without a backend identifier.
    pub fn new(user: User, room: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: None,
            user,
            room: room.into(),
            text: text.into(),
        }
    }

    /// Sets the backend message identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A user entering or leaving a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMessage {
    pub user: User,
    pub room: String,
}

/// A room topic change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMessage {
    pub user: User,
    pub room: String,
    pub topic: String,
}

/// An inbound unit of data received by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Chat text.
    Text(TextMessage),
    /// A user joined a room.
    Enter(PresenceMessage),
    /// A user left a room.
    Leave(PresenceMessage),
    /// The room topic changed.
    Topic(TopicMessage),
    /// A payload the adapter could not coerce into a recognised variant.
    ///
    /// The dispatcher logs and ignores these.
    Unknown {
        /// Backend-specific kind tag, for logging.
        kind: String,
        user: User,
        room: String,
    },
}

impl Message {
    /// Shorthand for a [`Message::Text`].
    pub fn text(user: User, room: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text(TextMessage::new(user, room, text))
    }

    /// Returns the user this message originates from.
    pub fn user(&self) -> &User {
        match self {
            Self::Text(m) => &m.user,
            Self::Enter(m) | Self::Leave(m) => &m.user,
            Self::Topic(m) => &m.user,
            Self::Unknown { user, .. } => user,
        }
    }

    /// Returns the room this message was received in.
    pub fn room(&self) -> &str {
        match self {
            Self::Text(m) => &m.room,
            Self::Enter(m) | Self::Leave(m) => &m.room,
            Self::Topic(m) => &m.room,
            Self::Unknown { room, .. } => room,
        }
    }

    /// Returns the text a pattern listener matches against.
    ///
    /// Only [`Message::Text`] carries matchable text; topic changes expose the
    /// new topic so custom predicates can inspect it.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Text(m) => Some(&m.text),
            Self::Topic(m) => Some(&m.topic),
            _ => None,
        }
    }

    /// Returns the chat text of a [`Message::Text`].
    pub fn as_text(&self) -> Option<&TextMessage> {
        match self {
            Self::Text(m) => Some(m),
            _ => None,
        }
    }

    /// Returns a short tag naming the variant.
    pub fn kind(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Enter(_) => "enter",
            Self::Leave(_) => "leave",
            Self::Topic(_) => "topic",
            Self::Unknown { kind, .. } => kind,
        }
    }

    /// Returns `true` if the dispatcher can route this message to listeners.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unknown { .. })
    }
}

impl From<TextMessage> for Message {
    fn from(msg: TextMessage) -> Self {
        Self::Text(msg)
    }
}

impl From<TopicMessage> for Message {
    fn from(msg: TopicMessage) -> Self {
        Self::Topic(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_cover_every_variant() {
        let alice = User::new("u1").with_name("alice");
        let text = Message::text(alice.clone(), "general", "hello");
        assert_eq!(text.user(), &alice);
        assert_eq!(text.room(), "general");
        assert_eq!(text.body(), Some("hello"));
        assert_eq!(text.kind(), "text");

        let enter = Message::Enter(PresenceMessage {
            user: alice.clone(),
            room: "general".into(),
        });
        assert_eq!(enter.body(), None);
        assert_eq!(enter.kind(), "enter");
        assert!(enter.is_recognized());

        let unknown = Message::Unknown {
            kind: "reaction".into(),
            user: alice,
            room: "general".into(),
        };
        assert_eq!(unknown.kind(), "reaction");
        assert!(!unknown.is_recognized());
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        assert_eq!(User::new("u42").display_name(), "u42");
        assert_eq!(User::new("u42").with_name("bob").to_string(), "bob");
    }

    #[test]
    fn test_message_json_shape() {
        let msg = Message::text(User::new("u1"), "room", "hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hi");
        assert_eq!(json["user"]["id"], "u1");
    }
}
