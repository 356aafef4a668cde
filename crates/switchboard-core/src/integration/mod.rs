//! Integration layer - interfaces to chat backends.
//!
//! This module contains:
//! - The [`Adapter`] capability trait and its runtime context
//! - The [`Dispatcher`] boundary adapters hand inbound messages to

pub mod adapter;
pub mod dispatcher;

pub use adapter::{Adapter, AdapterContext, BoxedAdapter, ConfigurableAdapter};
pub use dispatcher::{BoxedDispatcher, Completion, Dispatcher};
