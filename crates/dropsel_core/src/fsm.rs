//! Minimal state-machine support for widget interaction states
//!
//! Widgets describe their states as small `Copy` enums and implement
//! [`StateTransitions`] to map an event (plus read-only context) to the next
//! state. [`Machine`] owns the current state and applies transitions.
//!
//! ```
//! use dropsel_core::fsm::{Machine, StateTransitions};
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq)]
//! enum Door { Shut, Ajar }
//!
//! enum Push { Open, Close }
//!
//! impl StateTransitions for Door {
//!     type Event = Push;
//!     type Context = ();
//!
//!     fn on_event(&self, event: &Push, _ctx: &()) -> Option<Self> {
//!         match (self, event) {
//!             (Door::Shut, Push::Open) => Some(Door::Ajar),
//!             (Door::Ajar, Push::Close) => Some(Door::Shut),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let mut door = Machine::new(Door::Shut);
//! assert!(door.dispatch(&Push::Open, &()));
//! assert!(!door.dispatch(&Push::Open, &()));
//! assert_eq!(door.state(), Door::Ajar);
//! ```

use std::fmt::Debug;

/// Trait for state types that react to events
pub trait StateTransitions: Clone + Copy + PartialEq + Eq + Debug + 'static {
    /// Event type driving the machine
    type Event;
    /// Read-only data a transition may consult
    type Context: ?Sized;

    /// Handle an event and return the new state, or None if no transition
    fn on_event(&self, event: &Self::Event, ctx: &Self::Context) -> Option<Self>;
}

/// Owner of a current state that applies [`StateTransitions`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Machine<S: StateTransitions> {
    state: S,
}

impl<S: StateTransitions + Default> Default for Machine<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: StateTransitions> Machine<S> {
    pub fn new(initial: S) -> Self {
        Self { state: initial }
    }

    /// Current state
    pub fn state(&self) -> S {
        self.state
    }

    /// Apply an event. Returns true when the state changed.
    ///
    /// A transition that maps a state onto itself is not a change.
    pub fn dispatch(&mut self, event: &S::Event, ctx: &S::Context) -> bool {
        match self.state.on_event(event, ctx) {
            Some(next) if next != self.state => {
                tracing::trace!("fsm transition {:?} -> {:?}", self.state, next);
                self.state = next;
                true
            }
            _ => false,
        }
    }
}
