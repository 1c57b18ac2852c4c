//! Roving-focus navigation over the flat option list
//!
//! States:
//!
//! ```text
//!            open (seed enabled)
//!   Closed ─────────────────────▶ OpenActive(i) ◀─┐ next/prev/first/last/jump
//!     ▲  │                            │      └─────┘
//!     │  │ open (no seed)             │ rebuild: option gone or disabled
//!     │  └─────────────▶ OpenIdle ◀───┘
//!     │                     │
//!     └──── close ──────────┘ (from any open state)
//! ```
//!
//! The cursor never rests on a disabled or missing entry. When the flat list
//! is rebuilt the cursor follows its option by id, or drops to `OpenIdle`.

use std::time::{Duration, Instant};

use dropsel_core::fsm::{Machine, StateTransitions};

use crate::flat::FlatOptions;
use crate::typeahead::{find_prefix_match, TypeaheadBuffer};

/// Navigation state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NavState {
    #[default]
    Closed,
    /// Open with no active option
    OpenIdle,
    /// Open with the option at this flat index active
    OpenActive(usize),
}

impl NavState {
    pub fn is_open(&self) -> bool {
        !matches!(self, NavState::Closed)
    }

    pub fn active_index(&self) -> Option<usize> {
        match self {
            NavState::OpenActive(index) => Some(*index),
            _ => None,
        }
    }
}

/// Events driving [`NavState`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavEvent {
    /// Open, seeding the cursor when `seed` is an enabled index
    Open { seed: Option<usize> },
    Close,
    Next,
    Prev,
    First,
    Last,
    /// Move to a specific index (ignored if disabled or out of range)
    Jump(usize),
    /// The flat list was rebuilt; `position` is where the active option now lives
    Rebuilt { position: Option<usize> },
}

impl StateTransitions for NavState {
    type Event = NavEvent;
    type Context = FlatOptions;

    fn on_event(&self, event: &NavEvent, flat: &FlatOptions) -> Option<Self> {
        use NavEvent::*;
        use NavState::*;

        let active = |index: Option<usize>| index.map(OpenActive);

        match (*self, *event) {
            (Closed, Open { seed }) => Some(match seed.filter(|&i| flat.is_enabled(i)) {
                Some(index) => OpenActive(index),
                None => OpenIdle,
            }),
            (Closed, _) => None,

            (_, Close) => Some(Closed),
            (_, Open { .. }) => None,

            (OpenIdle, Next) => active(flat.next_enabled(None)),
            (OpenIdle, Prev) => active(flat.prev_enabled(None)),
            (OpenActive(i), Next) => active(flat.next_enabled(Some(i))),
            (OpenActive(i), Prev) => active(flat.prev_enabled(Some(i))),

            (_, First) => active(flat.first_enabled()),
            (_, Last) => active(flat.last_enabled()),
            (_, Jump(index)) => flat.is_enabled(index).then_some(OpenActive(index)),

            (OpenIdle, Rebuilt { .. }) => None,
            (OpenActive(_), Rebuilt { position }) => {
                Some(match position.filter(|&i| flat.is_enabled(i)) {
                    Some(index) => OpenActive(index),
                    None => OpenIdle,
                })
            }
        }
    }
}

/// Navigation state plus the identity of the active option and the type-ahead buffer
#[derive(Clone, Debug, Default)]
pub struct Navigator {
    machine: Machine<NavState>,
    /// Id of the active option, used to follow it across rebuilds
    active_id: Option<String>,
    typeahead: TypeaheadBuffer,
}

impl Navigator {
    pub fn new(typeahead_quiet: Duration) -> Self {
        Self {
            machine: Machine::new(NavState::Closed),
            active_id: None,
            typeahead: TypeaheadBuffer::new(typeahead_quiet),
        }
    }

    pub fn state(&self) -> NavState {
        self.machine.state()
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.state().active_index()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn set_typeahead_quiet(&mut self, quiet: Duration) {
        self.typeahead.set_quiet_interval(quiet);
    }

    fn apply(&mut self, event: NavEvent, flat: &FlatOptions) -> bool {
        let changed = self.machine.dispatch(&event, flat);
        self.active_id = self
            .active_index()
            .and_then(|index| flat.get(index))
            .map(|entry| entry.option.id.clone());
        if changed {
            tracing::trace!("Navigator: {:?} -> {:?}", event, self.state());
        }
        changed
    }

    /// Open, landing on `seed` when it is an enabled index
    pub fn open(&mut self, flat: &FlatOptions, seed: Option<usize>) -> bool {
        self.typeahead.reset();
        self.apply(NavEvent::Open { seed }, flat)
    }

    /// Close and discard the cursor
    pub fn close(&mut self) -> bool {
        self.typeahead.reset();
        let changed = self.machine.dispatch(&NavEvent::Close, &FlatOptions::default());
        self.active_id = None;
        changed
    }

    pub fn next(&mut self, flat: &FlatOptions) -> bool {
        self.apply(NavEvent::Next, flat)
    }

    pub fn prev(&mut self, flat: &FlatOptions) -> bool {
        self.apply(NavEvent::Prev, flat)
    }

    pub fn first(&mut self, flat: &FlatOptions) -> bool {
        self.apply(NavEvent::First, flat)
    }

    pub fn last(&mut self, flat: &FlatOptions) -> bool {
        self.apply(NavEvent::Last, flat)
    }

    pub fn jump(&mut self, flat: &FlatOptions, index: usize) -> bool {
        self.apply(NavEvent::Jump(index), flat)
    }

    /// Feed a typed character; jumps to the first enabled label starting
    /// with the buffered text. No match leaves the cursor where it is.
    pub fn typeahead(&mut self, ch: char, now: Instant, flat: &FlatOptions) -> bool {
        if !self.is_open() {
            return false;
        }
        let prefix = self.typeahead.push(ch, now).to_string();
        match find_prefix_match(flat, &prefix) {
            Some(index) => self.jump(flat, index),
            None => false,
        }
    }

    /// Re-validate the cursor after `flat` was rebuilt
    pub fn revalidate(&mut self, flat: &FlatOptions) -> bool {
        let position = self
            .active_id
            .as_deref()
            .and_then(|id| flat.position_of(id));
        self.apply(NavEvent::Rebuilt { position }, flat)
    }
}
