//! Per-dispatch response context.
//!
//! A [`Response`] is created for each (message, matched listener) pair and
//! handed to the listener's callback. It carries the addressing needed to
//! answer: outbound calls go through the robot, which resolves the adapter
//! named in the envelope.

use std::sync::Arc;

use rand::seq::SliceRandom;
use switchboard_core::{DispatchResult, Envelope, Message, User};

use crate::listener::MatchData;
use crate::robot::Robot;

// ============================================================================
// IntoStrings
// ============================================================================

/// Conversion into the ordered string sequence an adapter delivers.
///
/// A single string is promoted to a one-element sequence.
pub trait IntoStrings {
    fn into_strings(self) -> Vec<String>;
}

impl IntoStrings for String {
    fn into_strings(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoStrings for &str {
    fn into_strings(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoStrings for &String {
    fn into_strings(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl IntoStrings for Vec<String> {
    fn into_strings(self) -> Vec<String> {
        self
    }
}

impl IntoStrings for Vec<&str> {
    fn into_strings(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoStrings for &[String] {
    fn into_strings(self) -> Vec<String> {
        self.to_vec()
    }
}

impl IntoStrings for &[&str] {
    fn into_strings(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoStrings for [&str; N] {
    fn into_strings(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

// ============================================================================
// Response
// ============================================================================

/// Context handed to a matched listener's callback.
///
/// Cheap to clone; lives for one dispatch invocation.
#[derive(Clone)]
pub struct Response {
    robot: Robot,
    message: Arc<Message>,
    envelope: Envelope,
    matches: Arc<MatchData>,
    listener: Option<String>,
}

impl Response {
    pub(crate) fn new(
        robot: Robot,
        message: Arc<Message>,
        envelope: Envelope,
        matches: MatchData,
        listener: Option<String>,
    ) -> Self {
        Self {
            robot,
            message,
            envelope,
            matches: Arc::new(matches),
            listener,
        }
    }

    /// Returns the robot that dispatched the message.
    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    /// Returns the inbound message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Returns the sender of the inbound message.
    pub fn user(&self) -> &User {
        self.message.user()
    }

    /// Returns the reply envelope.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Returns the match groups.
    pub fn matches(&self) -> &MatchData {
        &self.matches
    }

    /// Returns positional group `index` (0 is the whole match).
    pub fn group(&self, index: usize) -> Option<&str> {
        self.matches.get(index)
    }

    /// Returns the named group `name`.
    pub fn named(&self, name: &str) -> Option<&str> {
        self.matches.name(name)
    }

    /// Returns the `id` option of the listener that produced this response.
    pub fn listener_id(&self) -> Option<&str> {
        self.listener.as_deref()
    }

    /// Sends strings to the room the message came from.
    pub async fn send(&self, strings: impl IntoStrings) -> DispatchResult<()> {
        self.robot.send(&self.envelope, strings).await
    }

    /// Sends strings addressed to the user who sent the message.
    pub async fn reply(&self, strings: impl IntoStrings) -> DispatchResult<()> {
        self.robot.reply(&self.envelope, strings).await
    }

    /// Sends strings as an emote.
    ///
    /// Goes straight to the resolved adapter, which may ignore it.
    pub async fn emote(&self, strings: impl IntoStrings) -> DispatchResult<()> {
        let adapter = self.robot.resolve(&self.envelope)?;
        adapter.emote(&self.envelope, &strings.into_strings()).await?;
        Ok(())
    }

    /// Sets the room topic.
    ///
    /// Goes straight to the resolved adapter, which may ignore it.
    pub async fn topic(&self, strings: impl IntoStrings) -> DispatchResult<()> {
        let adapter = self.robot.resolve(&self.envelope)?;
        adapter.topic(&self.envelope, &strings.into_strings()).await?;
        Ok(())
    }

    /// Plays a sound or media item in the room.
    pub async fn play(&self, strings: impl IntoStrings) -> DispatchResult<()> {
        self.robot.play(&self.envelope, strings).await
    }

    /// Picks a random element of `items`.
    pub fn random<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut rand::thread_rng())
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("message", &self.message)
            .field("envelope", &self.envelope)
            .field("matches", &self.matches)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_string_is_promoted() {
        assert_eq!("hi".into_strings(), vec!["hi".to_string()]);
        assert_eq!(String::from("hi").into_strings(), vec!["hi".to_string()]);
    }

    #[test]
    fn test_sequences_keep_order() {
        assert_eq!(["a", "b", "c"].into_strings(), vec!["a", "b", "c"]);
        assert_eq!(vec!["x", "y"].into_strings(), vec!["x", "y"]);
        let owned = vec!["1".to_string(), "2".to_string()];
        assert_eq!(owned.as_slice().into_strings(), owned);
    }

    #[test]
    fn test_random_picks_from_items() {
        let robot = Robot::new("bot");
        let message = Arc::new(Message::text(User::new("u1"), "room", "hi"));
        let envelope = Envelope::from_message(&message, "test");
        let res = Response::new(robot, message, envelope, MatchData::whole("hi"), None);

        let items = ["a", "b", "c"];
        let picked = res.random(&items).unwrap();
        assert!(items.contains(picked));
        assert!(res.random::<u8>(&[]).is_none());
        assert_eq!(res.group(0), Some("hi"));
        assert_eq!(res.user().id, "u1");
    }
}
