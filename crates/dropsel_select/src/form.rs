//! Form binding protocol
//!
//! A form library talks to a control through [`ValueAccessor`]: it pushes
//! values in with `write_value`, hears about user edits through the change
//! callback, learns the control was touched, and can disable it as a whole.

use serde_json::Value;

use crate::selection::SelectionValue;

/// Invoked with the new value after a user-initiated change
pub type ValueChangeCallback = Box<dyn FnMut(&SelectionValue) + Send>;

/// Invoked once, on the first user interaction
pub type TouchedCallback = Box<dyn FnMut() + Send>;

/// Controlled-value protocol between a form and a control
pub trait ValueAccessor {
    /// Replace the value from outside. Never reported as a change.
    fn write_value(&mut self, value: Value);

    /// Register the change callback, replacing any previous one
    fn on_value_change(&mut self, callback: ValueChangeCallback);

    /// Register the touched callback, replacing any previous one
    fn on_touched(&mut self, callback: TouchedCallback);

    /// Disable or re-enable the control without touching its value
    fn set_disabled_state(&mut self, disabled: bool);
}
