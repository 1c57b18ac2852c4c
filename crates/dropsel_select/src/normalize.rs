//! Option normalizer - one canonical list from either ingestion path
//!
//! A dropdown gets its options either from an array of records (`content`)
//! or from declaratively registered children. The two are never merged: the
//! source is resolved once per pass by [`NormalizationSource::resolve`], and
//! array data, when present, wins outright.
//!
//! # Array records
//!
//! ```
//! use dropsel_select::normalize::{normalize, FieldSelectors, NormalizationSource};
//! use serde_json::json;
//!
//! let records = vec![
//!     json!({"code": "de", "name": "Germany"}),
//!     json!({"label": "Nordics", "options": [
//!         {"code": "se", "name": "Sweden"},
//!         {"code": "no", "name": "Norway", "disabled": true},
//!     ]}),
//! ];
//! let fields = FieldSelectors::new("code", "name");
//!
//! let list = normalize(NormalizationSource::Array { records: &records, fields: &fields });
//! assert_eq!(list.len(), 2);
//! assert_eq!(list.option_count(), 3);
//! ```

use dropsel_core::key::generate_token;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::declarative::{Child, DeclarativeTree, OptionRegistration};
use crate::option::{CanonicalList, ListItem, OptionGroup, SelectOption};

/// Reserved record key holding a group's children
pub const GROUP_OPTIONS_KEY: &str = "options";

/// Label used when a record has no label at all
pub const LABEL_PLACEHOLDER: &str = "-";

const ID_KEY: &str = "id";
const DISABLED_KEY: &str = "disabled";

/// Field names used to read value and label from array records
///
/// Selectors may be dotted paths into nested objects (`"meta.code"`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelectors {
    pub value_field: String,
    pub label_field: String,
}

impl Default for FieldSelectors {
    fn default() -> Self {
        Self {
            value_field: "value".to_string(),
            label_field: "label".to_string(),
        }
    }
}

impl FieldSelectors {
    pub fn new(value_field: impl Into<String>, label_field: impl Into<String>) -> Self {
        Self {
            value_field: value_field.into(),
            label_field: label_field.into(),
        }
    }

    /// Resolve a dotted path within a record. Unresolvable paths yield None.
    pub fn resolve<'a>(record: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
        let mut segments = path.split('.');
        let mut current = record.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

/// The single source of truth for one normalization pass
#[derive(Clone, Copy, Debug)]
pub enum NormalizationSource<'a> {
    /// Array-of-records mode
    Array {
        records: &'a [Value],
        fields: &'a FieldSelectors,
    },
    /// Declaratively registered children
    Declarative(&'a DeclarativeTree),
}

impl<'a> NormalizationSource<'a> {
    /// Pick the source: array content when present (even if empty), otherwise children
    pub fn resolve(
        content: Option<&'a [Value]>,
        fields: &'a FieldSelectors,
        children: &'a DeclarativeTree,
    ) -> Self {
        match content {
            Some(records) => NormalizationSource::Array { records, fields },
            None => NormalizationSource::Declarative(children),
        }
    }
}

/// Build a fresh canonical list from `source`
///
/// Never fails: malformed records are skipped and an empty source yields an
/// empty list.
pub fn normalize(source: NormalizationSource<'_>) -> CanonicalList {
    let items = match source {
        NormalizationSource::Array { records, fields } => normalize_records(records, fields),
        NormalizationSource::Declarative(tree) => normalize_tree(tree),
    };
    let list = CanonicalList::new(items);

    tracing::debug!(
        "normalize: {} top-level items, {} options",
        list.len(),
        list.option_count()
    );
    list
}

// =============================================================================
// Array mode
// =============================================================================

fn normalize_records(records: &[Value], fields: &FieldSelectors) -> Vec<ListItem> {
    records
        .iter()
        .filter_map(|record| normalize_record(record, fields))
        .collect()
}

fn normalize_record(record: &Value, fields: &FieldSelectors) -> Option<ListItem> {
    match record {
        Value::Object(map) => {
            let children = map
                .get(GROUP_OPTIONS_KEY)
                .and_then(Value::as_array)
                .filter(|children| !children.is_empty());

            Some(match children {
                Some(children) => ListItem::Group(record_group(map, children, fields)),
                None => ListItem::Option(record_option(map, fields, None)),
            })
        }
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            Some(ListItem::Option(primitive_option(record, None)))
        }
        Value::Null | Value::Array(_) => {
            tracing::trace!("normalize: skipping record {}", record);
            None
        }
    }
}

fn record_group(map: &Map<String, Value>, children: &[Value], fields: &FieldSelectors) -> OptionGroup {
    let id = record_id(map).unwrap_or_else(|| generate_token("group"));
    let options = children
        .iter()
        .filter_map(|child| match child {
            Value::Object(child) => Some(record_option(child, fields, Some(id.as_str()))),
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                Some(primitive_option(child, Some(id.as_str())))
            }
            Value::Null | Value::Array(_) => None,
        })
        .collect();

    OptionGroup {
        label: label_text(FieldSelectors::resolve(map, &fields.label_field)),
        disabled: record_disabled(map),
        options,
        id,
    }
}

fn record_option(map: &Map<String, Value>, fields: &FieldSelectors, group_id: Option<&str>) -> SelectOption {
    SelectOption {
        id: record_id(map).unwrap_or_else(|| generate_token("opt")),
        value: FieldSelectors::resolve(map, &fields.value_field)
            .cloned()
            .unwrap_or(Value::Null),
        label: label_text(FieldSelectors::resolve(map, &fields.label_field)),
        disabled: record_disabled(map),
        group_id: group_id.map(str::to_string),
    }
}

fn primitive_option(value: &Value, group_id: Option<&str>) -> SelectOption {
    SelectOption {
        id: generate_token("opt"),
        value: value.clone(),
        label: label_text(Some(value)),
        disabled: false,
        group_id: group_id.map(str::to_string),
    }
}

fn record_id(map: &Map<String, Value>) -> Option<String> {
    match map.get(ID_KEY)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn record_disabled(map: &Map<String, Value>) -> bool {
    map.get(DISABLED_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Render a label field: absent -> placeholder, null -> empty
fn label_text(value: Option<&Value>) -> String {
    match value {
        None => LABEL_PLACEHOLDER.to_string(),
        Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

// =============================================================================
// Declarative mode
// =============================================================================

fn normalize_tree(tree: &DeclarativeTree) -> Vec<ListItem> {
    // First claimant wins
    let mut owner = FxHashMap::default();
    for (key, child) in tree.children() {
        if let Child::Group { claims, .. } = child {
            for claimed in claims {
                if tree.option(*claimed).is_some() {
                    owner.entry(*claimed).or_insert(key);
                }
            }
        }
    }

    let mut items = Vec::new();
    for (key, child) in tree.children() {
        match child {
            Child::Option(option) => {
                if !owner.contains_key(&key) {
                    items.push(ListItem::Option(registered_option(option, None)));
                }
            }
            Child::Group { group, claims } => {
                let id = group.id.clone().unwrap_or_else(|| generate_token("group"));
                let options = claims
                    .iter()
                    .filter(|claimed| owner.get(*claimed) == Some(&key))
                    .filter_map(|claimed| tree.option(*claimed))
                    .map(|option| registered_option(option, Some(id.as_str())))
                    .collect();
                items.push(ListItem::Group(OptionGroup {
                    label: group
                        .label
                        .clone()
                        .unwrap_or_else(|| LABEL_PLACEHOLDER.to_string()),
                    disabled: group.disabled,
                    options,
                    id,
                }));
            }
        }
    }
    items
}

fn registered_option(option: &OptionRegistration, group_id: Option<&str>) -> SelectOption {
    SelectOption {
        id: option.id.clone().unwrap_or_else(|| generate_token("opt")),
        value: option.value.clone(),
        label: option
            .label
            .clone()
            .unwrap_or_else(|| LABEL_PLACEHOLDER.to_string()),
        disabled: option.disabled,
        group_id: group_id.map(str::to_string),
    }
}
