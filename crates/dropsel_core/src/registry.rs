//! Exclusivity registry - "only one open at a time" across a screen
//!
//! The registry is a broadcast point shared by every dropdown instance on a
//! screen. An instance announces itself with [`ExclusivityRegistry::notify_opened`]
//! before it opens; every subscriber hears the announcement and decides for
//! itself whether to close (it closes when the opener is somebody else).
//!
//! The registry is owned by the composition root and handed to each instance,
//! it is not a hidden global. Subscriptions are torn down when the returned
//! [`Subscription`] is dropped, so a disposed instance is never notified.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use dropsel_core::registry::ExclusivityRegistry;
//!
//! let registry = ExclusivityRegistry::new();
//!
//! let a_open = Arc::new(AtomicBool::new(true));
//! let flag = a_open.clone();
//! let _sub = registry.subscribe("a", move |opener| {
//!     if opener != "a" {
//!         flag.store(false, Ordering::SeqCst);
//!     }
//! });
//!
//! registry.notify_opened("b");
//! assert!(!a_open.load(Ordering::SeqCst));
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

new_key_type! {
    /// Unique identifier for a registry subscription
    pub struct SubscriberId;
}

/// Callback invoked with the id of the instance that just opened
pub type OpenedCallback = Arc<dyn Fn(&str) + Send + Sync>;

struct Subscriber {
    instance: String,
    callback: OpenedCallback,
}

#[derive(Default)]
struct RegistryInner {
    subscribers: RwLock<SlotMap<SubscriberId, Subscriber>>,
    /// Most recently opened instance, cleared when that instance closes
    last_opened: Mutex<Option<String>>,
    /// Set while callbacks run; nested announcements are queued instead
    dispatching: AtomicBool,
    pending: Mutex<VecDeque<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RegistryInner {
    fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    fn remove(&self, id: SubscriberId) -> bool {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// Deliver one announcement to every live subscriber
    fn dispatch(&self, opener: &str) {
        let targets: SmallVec<[(SubscriberId, OpenedCallback); 8]> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, sub)| (id, Arc::clone(&sub.callback)))
            .collect();

        tracing::debug!(
            "ExclusivityRegistry: {} opened, notifying {} subscribers",
            opener,
            targets.len()
        );

        for (id, callback) in targets {
            // A callback earlier in this round may have disposed a later subscriber
            if self.is_subscribed(id) {
                callback(opener);
            }
        }
    }
}

/// Shared broadcast point for open announcements (cheap to clone)
#[derive(Clone, Default)]
pub struct ExclusivityRegistry {
    inner: Arc<RegistryInner>,
}

impl ExclusivityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `instance` to open announcements
    ///
    /// The callback receives the id of every instance that opens, including
    /// `instance` itself; it is the subscriber's job to ignore its own.
    /// Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe<F>(&self, instance: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let instance = instance.into();
        let id = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Subscriber {
                instance: instance.clone(),
                callback: Arc::new(callback),
            });

        tracing::debug!("ExclusivityRegistry: {} subscribed as {:?}", instance, id);

        Subscription {
            registry: Arc::downgrade(&self.inner),
            id,
            instance,
        }
    }

    /// Announce that `instance` is opening
    ///
    /// Repeating the announcement from the most recently opened instance has
    /// no effect. Announcements made from inside a subscriber callback are
    /// queued and delivered after the current round completes.
    pub fn notify_opened(&self, instance: &str) {
        {
            let mut last = lock(&self.inner.last_opened);
            if last.as_deref() == Some(instance) {
                return;
            }
            *last = Some(instance.to_string());
        }

        if self.inner.dispatching.swap(true, Ordering::SeqCst) {
            lock(&self.inner.pending).push_back(instance.to_string());
            return;
        }

        let mut next = Some(instance.to_string());
        while let Some(opener) = next {
            self.inner.dispatch(&opener);
            next = lock(&self.inner.pending).pop_front();
        }

        self.inner.dispatching.store(false, Ordering::SeqCst);
    }

    /// Record that `instance` closed
    ///
    /// Closing is idempotent: it only clears the record when `instance` is
    /// the most recently opened one.
    pub fn notify_closed(&self, instance: &str) {
        let mut last = lock(&self.inner.last_opened);
        if last.as_deref() == Some(instance) {
            *last = None;
        }
    }

    /// Id of the most recently opened instance that has not closed since
    pub fn last_opened(&self) -> Option<String> {
        lock(&self.inner.last_opened).clone()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for ExclusivityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExclusivityRegistry")
            .field("subscribers", &self.subscriber_count())
            .field("last_opened", &self.last_opened())
            .finish()
    }
}

/// Live subscription to an [`ExclusivityRegistry`]
///
/// Unsubscribes on drop. Holds only a weak reference, so it never keeps the
/// registry alive on its own.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<RegistryInner>,
    id: SubscriberId,
    instance: String,
}

impl Subscription {
    /// The subscribed instance id
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// The subscription key
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Unsubscribe now (equivalent to dropping)
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            if inner.remove(self.id) {
                tracing::debug!("ExclusivityRegistry: {} unsubscribed", self.instance);
            }
        }
    }
}
