//! Dropsel Core
//!
//! Framework primitives shared by Dropsel widgets:
//!
//! - **Instance Keys**: stable identities for widget instances and generated item ids
//! - **Exclusivity Registry**: publish/subscribe point that keeps one popup open per screen
//! - **State Machines**: small `Copy` state enums driven by typed events
//! - **Deferred Tasks**: cancellable "after this event" work driven by the host's tick
//!
//! # Example
//!
//! ```rust
//! use dropsel_core::{ExclusivityRegistry, InstanceKey, TaskQueue};
//!
//! // Composition root owns the shared pieces and hands them to widgets
//! let registry = ExclusivityRegistry::new();
//! let tasks = TaskQueue::new();
//!
//! let key = InstanceKey::new("select");
//! let _sub = registry.subscribe(key.get(), |_opener| {});
//! assert_eq!(registry.subscriber_count(), 1);
//! assert!(tasks.is_empty());
//! ```

pub mod fsm;
pub mod key;
pub mod registry;
pub mod tasks;

pub use fsm::{Machine, StateTransitions};
pub use key::{generate_token, InstanceKey};
pub use registry::{ExclusivityRegistry, OpenedCallback, SubscriberId, Subscription};
pub use tasks::{TaskHandle, TaskQueue};
