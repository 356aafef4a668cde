//! Foundation layer - data model and error types.
//!
//! This module contains the fundamental building blocks of Switchboard:
//! - Message variants produced by adapters
//! - Envelopes addressing outbound messages
//! - Error types shared by adapters and the dispatcher

pub mod envelope;
pub mod error;
pub mod message;

pub use envelope::Envelope;
pub use error::{AdapterError, AdapterResult, DispatchError, DispatchResult};
pub use message::{Message, PresenceMessage, TextMessage, TopicMessage, User};
