//! Runtime lifecycle state machine.
//!
//! ```text
//! Created → Configured → AdaptersLoaded → PluginsLoaded → Running → ShuttingDown → Stopped
//! ```
//!
//! `ShuttingDown` may also be entered from any state from `Configured` on, so
//! a runtime that fails half-way through startup can still be stopped.
//! Collaborators register hooks for the state they care about; hooks run in
//! registration order each time the state is entered.

use std::fmt;

use switchboard_framework::Robot;
use thiserror::Error;
use tracing::{debug, info};

/// A runtime lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Created,
    Configured,
    AdaptersLoaded,
    PluginsLoaded,
    Running,
    ShuttingDown,
    Stopped,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Configured => "configured",
            Self::AdaptersLoaded => "adapters_loaded",
            Self::PluginsLoaded => "plugins_loaded",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }

    /// The state that normally follows this one.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::Configured),
            Self::Configured => Some(Self::AdaptersLoaded),
            Self::AdaptersLoaded => Some(Self::PluginsLoaded),
            Self::PluginsLoaded => Some(Self::Running),
            Self::Running => Some(Self::ShuttingDown),
            Self::ShuttingDown => Some(Self::Stopped),
            Self::Stopped => None,
        }
    }

    /// Whether `to` may be entered from this state.
    pub fn can_advance_to(&self, to: Self) -> bool {
        if self.next() == Some(to) {
            return true;
        }
        to == Self::ShuttingDown && *self >= Self::Configured && *self < Self::ShuttingDown
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
}

/// A callback run when a lifecycle state is entered.
pub type LifecycleHook = Box<dyn Fn(&Robot) + Send + Sync>;

/// Tracks the current state and the hooks registered per state.
pub struct Lifecycle {
    state: LifecycleState,
    hooks: Vec<(LifecycleState, LifecycleHook)>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Created,
            hooks: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Registers `hook` to run whenever `state` is entered.
    pub fn on<F>(&mut self, state: LifecycleState, hook: F)
    where
        F: Fn(&Robot) + Send + Sync + 'static,
    {
        self.hooks.push((state, Box::new(hook)));
    }

    /// Moves to `next` and runs its hooks.
    pub fn advance(&mut self, next: LifecycleState, robot: &Robot) -> Result<(), LifecycleError> {
        if !self.state.can_advance_to(next) {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        debug!(from = %self.state, to = %next, "Lifecycle transition");
        self.state = next;

        let hooks: Vec<_> = self.hooks.iter().filter(|(s, _)| *s == next).collect();
        if !hooks.is_empty() {
            info!(state = %next, count = hooks.len(), "Running lifecycle hooks");
        }
        for (_, hook) in hooks {
            hook(robot);
        }
        Ok(())
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    use LifecycleState::*;

    #[test]
    fn test_full_forward_sequence() {
        let robot = Robot::new("hubot");
        let mut lifecycle = Lifecycle::new();

        for state in [Configured, AdaptersLoaded, PluginsLoaded, Running, ShuttingDown, Stopped] {
            lifecycle.advance(state, &robot).unwrap();
            assert_eq!(lifecycle.state(), state);
        }
        assert_eq!(lifecycle.state().next(), None);
    }

    #[test]
    fn test_skipping_a_state_is_rejected() {
        let robot = Robot::new("hubot");
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(Configured, &robot).unwrap();

        let err = lifecycle.advance(Running, &robot).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: Configured,
                to: Running
            }
        );
        assert_eq!(lifecycle.state(), Configured);
    }

    #[test]
    fn test_shutting_down_allowed_after_configured() {
        assert!(!Created.can_advance_to(ShuttingDown));
        assert!(Configured.can_advance_to(ShuttingDown));
        assert!(AdaptersLoaded.can_advance_to(ShuttingDown));
        assert!(!ShuttingDown.can_advance_to(ShuttingDown));
        assert!(!Stopped.can_advance_to(ShuttingDown));
        assert!(!Running.can_advance_to(Stopped));
    }

    #[test]
    fn test_hooks_run_in_registration_order_for_their_state() {
        let robot = Robot::new("hubot");
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut lifecycle = Lifecycle::new();

        for tag in ["first", "second"] {
            let trace = trace.clone();
            lifecycle.on(Configured, move |robot: &Robot| {
                trace.lock().push(format!("{tag}:{}", robot.name()));
            });
        }
        let other = trace.clone();
        lifecycle.on(Running, move |_: &Robot| other.lock().push("running".to_string()));

        lifecycle.advance(Configured, &robot).unwrap();

        assert_eq!(*trace.lock(), vec!["first:hubot", "second:hubot"]);
    }
}
