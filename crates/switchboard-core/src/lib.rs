//! # Switchboard Core
//!
//! The data model and adapter abstraction of the Switchboard bot framework.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Messages**: inbound variants produced by adapters ([`Message`], [`TextMessage`])
//! - **Addressing**: destination and delivering adapter ([`Envelope`])
//! - **Errors**: [`AdapterError`], [`DispatchError`]
//!
//! ### Integration Layer
//!
//! - **Adapter System**: backend connectors ([`Adapter`], [`ConfigurableAdapter`])
//! - **Dispatch Boundary**: where adapters hand messages over ([`Dispatcher`], [`AdapterContext`])
//!
//! ## Message Flow
//!
//! ```text
//! ┌─────────────┐ receive ┌────────────┐  test   ┌───────────┐
//! │   Adapter   │────────▶│ Dispatcher │────────▶│ Listener  │
//! │   (shell)   │         │  (Robot)   │────────▶│ Listener  │
//! └─────────────┘         └────────────┘         └───────────┘
//!        ▲     send/reply        │                     │
//!        └───────────────────────┴─────────────────────┘
//! ```

pub mod foundation;
pub mod integration;

pub use foundation::{
    AdapterError, AdapterResult, DispatchError, DispatchResult, Envelope, Message,
    PresenceMessage, TextMessage, TopicMessage, User,
};

pub use integration::{
    Adapter, AdapterContext, BoxedAdapter, BoxedDispatcher, Completion, ConfigurableAdapter,
    Dispatcher,
};

// Re-exported so adapters do not need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::*;
}
