//! Option model - the canonical, source-agnostic list of options and groups
//!
//! Both ingestion paths (array records and declarative children) normalize to
//! a [`CanonicalList`]: an ordered sequence of top-level [`ListItem`]s, each
//! either an ungrouped [`SelectOption`] or an [`OptionGroup`] of options.
//!
//! A canonical list is immutable once built. Re-normalization produces a new
//! list, so consumers can detect a change with [`CanonicalList::ptr_eq`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque option value, compared by structural equality
pub type OptionValue = Value;

/// A single selectable leaf item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Unique id, stable across re-filtering
    pub id: String,
    /// The value (stored in the selection when chosen)
    pub value: OptionValue,
    /// The display label (used for filtering and type-ahead)
    pub label: String,
    /// Whether this option is disabled on its own
    #[serde(default)]
    pub disabled: bool,
    /// Id of the containing group, if any
    #[serde(default)]
    pub group_id: Option<String>,
}

impl SelectOption {
    /// Create an enabled, ungrouped option
    pub fn new(id: impl Into<String>, value: impl Into<OptionValue>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            label: label.into(),
            disabled: false,
            group_id: None,
        }
    }

    /// Mark this option as disabled
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// A named container of options, filterable as a unit but not selectable
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub id: String,
    pub label: String,
    /// Disables every contained option when set
    #[serde(default)]
    pub disabled: bool,
    pub options: Vec<SelectOption>,
}

impl OptionGroup {
    /// Create an empty, enabled group
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            disabled: false,
            options: Vec::new(),
        }
    }

    /// Append an option, claiming it for this group
    pub fn option(mut self, mut option: SelectOption) -> Self {
        option.group_id = Some(self.id.clone());
        self.options.push(option);
        self
    }

    /// Mark the whole group as disabled
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Effective disabled state of a contained option
    pub fn is_option_disabled(&self, option: &SelectOption) -> bool {
        self.disabled || option.disabled
    }
}

/// A top-level entry of a [`CanonicalList`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListItem {
    Group(OptionGroup),
    Option(SelectOption),
}

impl ListItem {
    pub fn id(&self) -> &str {
        match self {
            ListItem::Group(group) => &group.id,
            ListItem::Option(option) => &option.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ListItem::Group(group) => &group.label,
            ListItem::Option(option) => &option.label,
        }
    }
}

impl From<SelectOption> for ListItem {
    fn from(option: SelectOption) -> Self {
        ListItem::Option(option)
    }
}

impl From<OptionGroup> for ListItem {
    fn from(group: OptionGroup) -> Self {
        ListItem::Group(group)
    }
}

/// A leaf option together with its effective disabled state
#[derive(Clone, Copy, Debug)]
pub struct Leaf<'a> {
    pub option: &'a SelectOption,
    /// `group.disabled || option.disabled`
    pub disabled: bool,
}

/// Ordered, immutable list of groups and ungrouped options
#[derive(Clone, Debug)]
pub struct CanonicalList {
    items: Arc<[ListItem]>,
}

impl Default for CanonicalList {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for CanonicalList {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.items == other.items
    }
}

impl CanonicalList {
    pub fn new(items: Vec<ListItem>) -> Self {
        Self {
            items: items.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    /// Number of top-level items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when both handles point at the same normalization result
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    /// All leaf options in display order, groups contributing their children in place
    pub fn leaves(&self) -> impl Iterator<Item = Leaf<'_>> {
        self.items.iter().flat_map(item_leaves)
    }

    /// Number of leaf options
    pub fn option_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                ListItem::Option(_) => 1,
                ListItem::Group(group) => group.options.len(),
            })
            .sum()
    }
}

fn item_leaves(item: &ListItem) -> Box<dyn Iterator<Item = Leaf<'_>> + '_> {
    match item {
        ListItem::Option(option) => Box::new(std::iter::once(Leaf {
            option,
            disabled: option.disabled,
        })),
        ListItem::Group(group) => Box::new(group.options.iter().map(move |option| Leaf {
            option,
            disabled: group.is_option_disabled(option),
        })),
    }
}

impl FromIterator<ListItem> for CanonicalList {
    fn from_iter<I: IntoIterator<Item = ListItem>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
