//! Flat option index - the navigation-order list of visible options
//!
//! Groups are a display and search concern only. Navigation and selection
//! work over [`FlatOptions`]: every visible leaf option in display order,
//! with its effective disabled state resolved.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::option::{Leaf, SelectOption};

/// A visible leaf option with its effective disabled state
#[derive(Clone, Debug, PartialEq)]
pub struct FlatOption {
    pub option: SelectOption,
    /// `group.disabled || option.disabled`
    pub disabled: bool,
}

impl From<Leaf<'_>> for FlatOption {
    fn from(leaf: Leaf<'_>) -> Self {
        Self {
            option: leaf.option.clone(),
            disabled: leaf.disabled,
        }
    }
}

/// Ordered list of visible options plus an id index
///
/// Duplicate ids resolve last-write-wins: [`position_of`](Self::position_of)
/// reports the last entry carrying the id.
#[derive(Clone, Debug, Default)]
pub struct FlatOptions {
    entries: Vec<FlatOption>,
    by_id: FxHashMap<String, usize>,
}

impl PartialEq for FlatOptions {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl FromIterator<FlatOption> for FlatOptions {
    fn from_iter<I: IntoIterator<Item = FlatOption>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl FlatOptions {
    pub fn new(entries: Vec<FlatOption>) -> Self {
        let mut by_id = FxHashMap::default();
        for (index, entry) in entries.iter().enumerate() {
            by_id.insert(entry.option.id.clone(), index);
        }
        Self { entries, by_id }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FlatOption> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FlatOption> {
        self.entries.iter()
    }

    /// Index of the option with `id` (last entry wins on duplicates)
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Entry for `id` (last entry wins on duplicates)
    pub fn find(&self, id: &str) -> Option<&FlatOption> {
        self.position_of(id).and_then(|index| self.entries.get(index))
    }

    /// Index of the first option whose value equals `value`
    pub fn position_of_value(&self, value: &Value) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| &entry.option.value == value)
    }

    /// Whether `index` exists and is not disabled
    pub fn is_enabled(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|entry| !entry.disabled)
    }

    pub fn enabled_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.disabled).count()
    }

    pub fn first_enabled(&self) -> Option<usize> {
        self.entries.iter().position(|entry| !entry.disabled)
    }

    pub fn last_enabled(&self) -> Option<usize> {
        self.entries.iter().rposition(|entry| !entry.disabled)
    }

    /// Next enabled index after `from`, wrapping around
    ///
    /// With no starting point this is the first enabled index. When `from` is
    /// the only enabled entry the result is `from` itself.
    pub fn next_enabled(&self, from: Option<usize>) -> Option<usize> {
        let len = self.entries.len();
        let Some(from) = from.filter(|&i| i < len) else {
            return self.first_enabled();
        };
        (1..=len)
            .map(|step| (from + step) % len)
            .find(|&index| !self.entries[index].disabled)
    }

    /// Previous enabled index before `from`, wrapping around
    pub fn prev_enabled(&self, from: Option<usize>) -> Option<usize> {
        let len = self.entries.len();
        let Some(from) = from.filter(|&i| i < len) else {
            return self.last_enabled();
        };
        (1..=len)
            .map(|step| (from + len - step) % len)
            .find(|&index| !self.entries[index].disabled)
    }
}

impl<'a> IntoIterator for &'a FlatOptions {
    type Item = &'a FlatOption;
    type IntoIter = std::slice::Iter<'a, FlatOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
