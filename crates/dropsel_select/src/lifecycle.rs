//! Open/close lifecycle of one dropdown instance
//!
//! Each [`Lifecycle`] subscribes to the screen's [`ExclusivityRegistry`].
//! Opening announces the instance first and then flips its own state, so
//! whichever sibling was open hears the announcement and dismisses itself.
//!
//! A dismissal happens inside the registry callback, where the owning
//! dropdown is not reachable. The callback only flips the shared
//! [`OpenState`] and raises a flag; the dropdown picks the flag up with
//! [`Lifecycle::take_dismissed`] before its next command or read.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use dropsel_core::fsm::{Machine, StateTransitions};
use dropsel_core::registry::{ExclusivityRegistry, Subscription};

/// Open state of one instance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OpenState {
    #[default]
    Closed,
    Open,
}

/// Events driving [`OpenState`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenEvent {
    Open,
    Close,
    /// Another instance opened
    Dismiss,
}

impl StateTransitions for OpenState {
    type Event = OpenEvent;
    type Context = ();

    fn on_event(&self, event: &OpenEvent, _ctx: &()) -> Option<Self> {
        match (self, event) {
            (OpenState::Closed, OpenEvent::Open) => Some(OpenState::Open),
            (OpenState::Open, OpenEvent::Close | OpenEvent::Dismiss) => Some(OpenState::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    machine: Machine<OpenState>,
    /// Bumped on every open, lets deferred work detect a reopen
    generation: u64,
    /// Set when a sibling's announcement closed this instance
    dismissed: bool,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Open/close state of one instance plus its registry subscription
pub struct Lifecycle {
    instance: String,
    shared: Arc<Mutex<Shared>>,
    registry: ExclusivityRegistry,
    subscription: Option<Subscription>,
}

impl Lifecycle {
    /// Create a closed lifecycle subscribed to `registry`
    pub fn new(instance: impl Into<String>, registry: ExclusivityRegistry) -> Self {
        let instance = instance.into();
        let shared = Arc::new(Mutex::new(Shared::default()));

        let weak = Arc::downgrade(&shared);
        let me = instance.clone();
        let subscription = registry.subscribe(instance.clone(), move |opener| {
            if opener == me {
                return;
            }
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut shared = lock(&shared);
            if shared.machine.dispatch(&OpenEvent::Dismiss, &()) {
                shared.dismissed = true;
                tracing::debug!("Lifecycle::dismiss - {} closed because {} opened", me, opener);
            }
        });

        Self {
            instance,
            shared,
            registry,
            subscription: Some(subscription),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn state(&self) -> OpenState {
        lock(&self.shared).machine.state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == OpenState::Open
    }

    pub fn is_disposed(&self) -> bool {
        self.subscription.is_none()
    }

    /// Announce, then open. Returns false if already open or disposed.
    pub fn open(&mut self) -> bool {
        if self.is_disposed() || self.is_open() {
            return false;
        }

        // The lock must not be held here: our own callback runs during dispatch
        self.registry.notify_opened(&self.instance);

        let mut shared = lock(&self.shared);
        let opened = shared.machine.dispatch(&OpenEvent::Open, &());
        if opened {
            shared.generation += 1;
            shared.dismissed = false;
            tracing::debug!(
                "Lifecycle::open - {} (generation {})",
                self.instance,
                shared.generation
            );
        }
        opened
    }

    /// Close. Closing a closed instance has no effect.
    pub fn close(&mut self) -> bool {
        let closed = lock(&self.shared).machine.dispatch(&OpenEvent::Close, &());
        if closed {
            self.registry.notify_closed(&self.instance);
            tracing::debug!("Lifecycle::close - {}", self.instance);
        }
        closed
    }

    /// Whether a sibling dismissed this instance since the last call
    pub fn take_dismissed(&mut self) -> bool {
        std::mem::take(&mut lock(&self.shared).dismissed)
    }

    /// Probe that stays valid only while the current open session lasts
    pub fn probe(&self) -> OpenProbe {
        OpenProbe {
            shared: Arc::downgrade(&self.shared),
            generation: lock(&self.shared).generation,
        }
    }

    /// Close and leave the registry. Idempotent.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.close();
        self.subscription = None;
        tracing::debug!("Lifecycle::dispose - {}", self.instance);
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("instance", &self.instance)
            .field("state", &self.state())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Checks whether the open session a deferred task was scheduled in is still current
#[derive(Clone, Debug)]
pub struct OpenProbe {
    shared: Weak<Mutex<Shared>>,
    generation: u64,
}

impl OpenProbe {
    /// True while the instance is alive, open, and has not been reopened since
    pub fn is_current(&self) -> bool {
        self.shared.upgrade().is_some_and(|shared| {
            let shared = lock(&shared);
            shared.machine.state() == OpenState::Open && shared.generation == self.generation
        })
    }
}
