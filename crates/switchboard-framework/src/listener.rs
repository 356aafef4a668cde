//! Listener system for the Switchboard framework.
//!
//! A [`Listener`] pairs a matcher with a callback. The robot tests every
//! registered listener against each inbound message, in registration order;
//! when the matcher succeeds, the callback is invoked with a [`Response`]
//! bound to the message, its envelope and the match groups.
//!
//! # Matchers
//!
//! | Kind | Registered with | Matches |
//! |------|-----------------|---------|
//! | [`ListenerKind::Hear`] | `Robot::hear` | any text message matching the regex |
//! | [`ListenerKind::Respond`] | `Robot::respond` | text addressed to the robot by name |
//! | [`ListenerKind::Custom`] | `Robot::listen` | whatever the predicate accepts |
//! | [`ListenerKind::CatchAll`] | `Robot::catch_all` | messages no other listener matched |
//!
//! # Failure Isolation
//!
//! Errors returned by a callback, and panics raised inside it, are caught at
//! the listener boundary and logged with the listener's label. They never
//! reach the dispatch loop.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use switchboard_core::{Envelope, Message};
use tracing::{debug, error, trace};

use crate::handler::ListenerCallback;
use crate::response::Response;
use crate::robot::Robot;

// ============================================================================
// Identity and options
// ============================================================================

/// Registration handle of a listener, unique within one robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Options attached to a listener at registration.
///
/// `id` names the listener in logs; any other keys are kept as free-form
/// metadata for plugins that want to tag their listeners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListenerOptions {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl ListenerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the listener identifier.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a metadata entry.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl From<&str> for ListenerOptions {
    fn from(id: &str) -> Self {
        Self::new().id(id)
    }
}

impl From<String> for ListenerOptions {
    fn from(id: String) -> Self {
        Self::new().id(id)
    }
}

impl From<()> for ListenerOptions {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

// ============================================================================
// MatchData
// ============================================================================

/// The capture groups of a successful match.
///
/// Group 0 is the whole match. Groups that did not participate are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchData {
    groups: Vec<Option<String>>,
    named: HashMap<String, String>,
}

impl MatchData {
    /// Creates match data with a single whole-match group.
    pub fn whole(text: impl Into<String>) -> Self {
        Self {
            groups: vec![Some(text.into())],
            named: HashMap::new(),
        }
    }

    /// Creates match data from positional groups.
    pub fn from_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(|g| g.map(Into::into)).collect(),
            named: HashMap::new(),
        }
    }

    /// Extracts the groups of `caps`, produced by `re`.
    pub fn from_captures(re: &Regex, caps: &Captures<'_>) -> Self {
        let groups = caps
            .iter()
            .map(|group| group.map(|m| m.as_str().to_string()))
            .collect();
        let named = re
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();
        Self { groups, named }
    }

    /// Returns group `index`, if it participated in the match.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Returns the named group `name`, if it participated in the match.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Returns the number of positional groups, including group 0.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// ============================================================================
// Listener
// ============================================================================

/// A custom message predicate.
pub type Predicate = Arc<dyn Fn(&Message) -> Option<MatchData> + Send + Sync>;

/// How a listener was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Hear,
    Respond,
    Custom,
    CatchAll,
}

impl ListenerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hear => "hear",
            Self::Respond => "respond",
            Self::Custom => "custom",
            Self::CatchAll => "catch_all",
        }
    }
}

/// The test a listener applies to each message.
#[derive(Clone)]
pub enum ListenerMatcher {
    /// Regex tested against the text of [`Message::Text`].
    Text(Regex),
    /// Arbitrary predicate over any message variant.
    Predicate(Predicate),
    /// Accepts every message; the robot only offers it unmatched messages.
    CatchAll,
}

impl ListenerMatcher {
    /// Tests `message`, returning the match groups on success.
    pub fn test(&self, message: &Message) -> Option<MatchData> {
        match self {
            Self::Text(re) => {
                let text = &message.as_text()?.text;
                re.captures(text).map(|caps| MatchData::from_captures(re, &caps))
            }
            Self::Predicate(predicate) => predicate(message),
            Self::CatchAll => Some(message.body().map(MatchData::whole).unwrap_or_default()),
        }
    }
}

impl fmt::Debug for ListenerMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(re) => f.debug_tuple("Text").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate"),
            Self::CatchAll => f.write_str("CatchAll"),
        }
    }
}

/// A registered matcher plus callback.
///
/// Listeners are immutable once registered.
pub struct Listener {
    id: ListenerId,
    kind: ListenerKind,
    matcher: ListenerMatcher,
    options: ListenerOptions,
    callback: ListenerCallback,
}

impl Listener {
    pub(crate) fn new(
        id: ListenerId,
        kind: ListenerKind,
        matcher: ListenerMatcher,
        options: ListenerOptions,
        callback: ListenerCallback,
    ) -> Self {
        Self {
            id,
            kind,
            matcher,
            options,
            callback,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    pub fn options(&self) -> &ListenerOptions {
        &self.options
    }

    /// Returns the name used for this listener in logs.
    pub fn label(&self) -> String {
        match &self.options.id {
            Some(id) => id.clone(),
            None => format!("{}{}", self.kind.as_str(), self.id),
        }
    }

    pub fn is_catch_all(&self) -> bool {
        self.kind == ListenerKind::CatchAll
    }

    /// Tests the message without invoking the callback.
    pub fn matches(&self, message: &Message) -> Option<MatchData> {
        self.matcher.test(message)
    }

    /// Tests the message and, on a match, invokes the callback.
    ///
    /// Returns `true` if the listener matched. Callback failures are logged,
    /// not returned.
    pub(crate) async fn call(
        &self,
        robot: &Robot,
        message: &Arc<Message>,
        envelope: &Envelope,
    ) -> bool {
        let Some(matches) = self.matches(message) else {
            trace!(listener = %self.label(), "Listener did not match, skipping");
            return false;
        };

        debug!(
            listener = %self.label(),
            kind = self.kind.as_str(),
            "Listener matched, invoking callback"
        );

        let response = Response::new(
            robot.clone(),
            Arc::clone(message),
            envelope.clone(),
            matches,
            self.options.id.clone(),
        );

        match AssertUnwindSafe((self.callback)(response)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(
                    listener = %self.label(),
                    error = %e,
                    "Listener callback returned an error"
                );
            }
            Err(panic) => {
                error!(
                    listener = %self.label(),
                    panic = panic_message(panic.as_ref()),
                    "Listener callback panicked"
                );
            }
        }

        true
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("matcher", &self.matcher)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::{PresenceMessage, User};

    fn text(body: &str) -> Message {
        Message::text(User::new("u1"), "room", body)
    }

    #[test]
    fn test_text_matcher_extracts_groups() {
        let re = Regex::new(r"(?P<verb>deploy|rollback) (\w+)(?: to (\w+))?").unwrap();
        let matcher = ListenerMatcher::Text(re);

        let data = matcher.test(&text("please deploy api")).unwrap();
        assert_eq!(data.get(0), Some("deploy api"));
        assert_eq!(data.get(1), Some("deploy"));
        assert_eq!(data.get(2), Some("api"));
        assert_eq!(data.get(3), None);
        assert_eq!(data.name("verb"), Some("deploy"));
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn test_text_matcher_ignores_non_text_messages() {
        let matcher = ListenerMatcher::Text(Regex::new(".*").unwrap());
        let enter = Message::Enter(PresenceMessage {
            user: User::new("u1"),
            room: "room".into(),
        });
        assert!(matcher.test(&enter).is_none());
    }

    #[test]
    fn test_predicate_matcher_sees_every_variant() {
        let matcher = ListenerMatcher::Predicate(Arc::new(|msg: &Message| {
            (msg.kind() == "enter").then(|| MatchData::whole(msg.user().id.clone()))
        }));
        let enter = Message::Enter(PresenceMessage {
            user: User::new("u7"),
            room: "room".into(),
        });

        assert_eq!(matcher.test(&enter).unwrap().get(0), Some("u7"));
        assert!(matcher.test(&text("hi")).is_none());
    }

    #[test]
    fn test_options_conversions() {
        let opts: ListenerOptions = "deploy.start".into();
        assert_eq!(opts.id.as_deref(), Some("deploy.start"));

        let opts = ListenerOptions::new().meta("help", "deploy <app>");
        assert_eq!(opts.metadata["help"], "deploy <app>");

        let json = serde_json::to_value(ListenerOptions::new().id("x").meta("k", 1)).unwrap();
        assert_eq!(json, serde_json::json!({"id": "x", "k": 1}));
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "<non-string panic payload>");
    }
}
