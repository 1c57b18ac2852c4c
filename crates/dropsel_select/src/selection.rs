//! Selection state - single and multiple value semantics
//!
//! Values are opaque JSON values compared structurally, so an option
//! rebuilt by a later normalization pass still reports as selected as long
//! as its value is equal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flat::{FlatOption, FlatOptions};
use crate::option::SelectOption;

/// Whether a dropdown holds one value or a set of values
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Single,
    Multiple,
}

impl SelectionMode {
    pub fn from_multiple(multiple: bool) -> Self {
        if multiple {
            SelectionMode::Multiple
        } else {
            SelectionMode::Single
        }
    }
}

/// The current selection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionValue {
    /// Single mode: no value or one value
    Single(Option<Value>),
    /// Multiple mode: a set of values (order is insertion order, not significant)
    Multiple(Vec<Value>),
}

impl Default for SelectionValue {
    fn default() -> Self {
        SelectionValue::Single(None)
    }
}

impl SelectionValue {
    /// The "no value" state for `mode`
    pub fn empty(mode: SelectionMode) -> Self {
        match mode {
            SelectionMode::Single => SelectionValue::Single(None),
            SelectionMode::Multiple => SelectionValue::Multiple(Vec::new()),
        }
    }

    /// Coerce an external JSON value into a selection for `mode`
    ///
    /// Single: `null` is no value, anything else is the value.
    /// Multiple: `null` is empty, an array contributes its elements
    /// (deduplicated), a scalar becomes a one-element set.
    pub fn from_json(mode: SelectionMode, external: Value) -> Self {
        match mode {
            SelectionMode::Single => match external {
                Value::Null => SelectionValue::Single(None),
                value => SelectionValue::Single(Some(value)),
            },
            SelectionMode::Multiple => {
                let items = match external {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items,
                    value => vec![value],
                };
                let mut set: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    if !set.contains(&item) {
                        set.push(item);
                    }
                }
                SelectionValue::Multiple(set)
            }
        }
    }

    /// External JSON form: `null`, the value, or an array
    pub fn to_json(&self) -> Value {
        match self {
            SelectionValue::Single(None) => Value::Null,
            SelectionValue::Single(Some(value)) => value.clone(),
            SelectionValue::Multiple(values) => Value::Array(values.clone()),
        }
    }

    pub fn mode(&self) -> SelectionMode {
        match self {
            SelectionValue::Single(_) => SelectionMode::Single,
            SelectionValue::Multiple(_) => SelectionMode::Multiple,
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        match self {
            SelectionValue::Single(current) => current.as_ref() == Some(value),
            SelectionValue::Multiple(values) => values.contains(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match self {
            SelectionValue::Single(current) => usize::from(current.is_some()),
            SelectionValue::Multiple(values) => values.len(),
        }
    }

    /// Selected values
    pub fn values(&self) -> &[Value] {
        match self {
            SelectionValue::Single(current) => current.as_slice(),
            SelectionValue::Multiple(values) => values,
        }
    }

    /// Convert to `mode`, keeping the first value when narrowing to single
    pub fn into_mode(self, mode: SelectionMode) -> Self {
        match (self, mode) {
            (SelectionValue::Single(value), SelectionMode::Multiple) => {
                SelectionValue::Multiple(value.into_iter().collect())
            }
            (SelectionValue::Multiple(values), SelectionMode::Single) => {
                SelectionValue::Single(values.into_iter().next())
            }
            (value, _) => value,
        }
    }
}

/// Result of a selection operation
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionChange {
    /// Nothing changed (disabled option, or already in the requested state)
    Unchanged,
    /// The selection changed to this value
    Changed(SelectionValue),
}

impl SelectionChange {
    pub fn is_changed(&self) -> bool {
        matches!(self, SelectionChange::Changed(_))
    }
}

/// Holds the current value and implements toggle semantics
///
/// In single mode several options may share the selected value. Only one of
/// them reports as selected: the option that was toggled, or after a write or
/// a rebuild the first option carrying the value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionState {
    value: SelectionValue,
    /// Single mode: id of the option showing the value
    owner: Option<String>,
}

impl SelectionState {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            value: SelectionValue::empty(mode),
            owner: None,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.value.mode()
    }

    pub fn value(&self) -> &SelectionValue {
        &self.value
    }

    /// Whether a toggle in this mode ends the interaction
    pub fn closes_on_toggle(&self) -> bool {
        self.mode() == SelectionMode::Single
    }

    pub fn is_selected(&self, option: &SelectOption) -> bool {
        match &self.value {
            SelectionValue::Single(_) => {
                self.owner.as_deref() == Some(option.id.as_str())
                    && self.value.contains(&option.value)
            }
            SelectionValue::Multiple(values) => values.contains(&option.value),
        }
    }

    /// Re-resolve the single-mode owner against `options`
    ///
    /// Keeps the current owner while it still carries the value, otherwise
    /// picks the first option with an equal value.
    pub fn anchor(&mut self, options: &FlatOptions) {
        let SelectionValue::Single(Some(value)) = &self.value else {
            self.owner = None;
            return;
        };
        let owned = self
            .owner
            .as_deref()
            .and_then(|id| options.find(id))
            .is_some_and(|entry| &entry.option.value == value);
        if !owned {
            self.owner = options
                .position_of_value(value)
                .and_then(|index| options.get(index))
                .map(|entry| entry.option.id.clone());
        }
    }

    /// Toggle `option` in or out of the selection
    ///
    /// Single mode replaces the value, or clears it when `option` is the
    /// current value. Multiple mode adds or removes by structural equality.
    /// Disabled options are inert.
    pub fn toggle(&mut self, option: &FlatOption) -> SelectionChange {
        if option.disabled {
            return SelectionChange::Unchanged;
        }
        let value = &option.option.value;

        match &mut self.value {
            SelectionValue::Single(current) => {
                if current.as_ref() == Some(value) {
                    *current = None;
                    self.owner = None;
                } else {
                    *current = Some(value.clone());
                    self.owner = Some(option.option.id.clone());
                }
            }
            SelectionValue::Multiple(values) => {
                if let Some(index) = values.iter().position(|v| v == value) {
                    values.remove(index);
                } else {
                    values.push(value.clone());
                }
            }
        }

        SelectionChange::Changed(self.value.clone())
    }

    /// Reset to "no value"
    pub fn clear(&mut self) -> SelectionChange {
        if self.value.is_empty() {
            return SelectionChange::Unchanged;
        }
        self.value = SelectionValue::empty(self.mode());
        self.owner = None;
        SelectionChange::Changed(self.value.clone())
    }

    /// Replace the value from outside (coerced to the current mode)
    ///
    /// The single-mode owner is resolved against `options`.
    pub fn write(&mut self, external: Value, options: &FlatOptions) {
        self.value = SelectionValue::from_json(self.mode(), external);
        self.owner = None;
        self.anchor(options);
    }

    /// Switch mode, keeping what survives the conversion
    pub fn set_mode(&mut self, mode: SelectionMode, options: &FlatOptions) {
        let value = std::mem::take(&mut self.value);
        self.value = value.into_mode(mode);
        self.anchor(options);
    }
}
