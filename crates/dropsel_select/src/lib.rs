//! # Dropsel Select
//!
//! Headless engine behind searchable, optionally grouped, optionally
//! multi-select dropdowns. Rendering is left to the host: the engine takes
//! commands and exposes a read model.
//!
//! ## Pipeline
//!
//! - **Normalizer** ([`normalize`]): array records or declarative children
//!   become one [`CanonicalList`] of groups and options
//! - **Filter** ([`filter`]): case- and diacritic-insensitive substring search,
//!   producing the display list and the flat navigation list
//! - **Selection** ([`selection`]): single or multiple values, compared structurally
//! - **Navigation** ([`navigation`]): roving active index with wrap-around,
//!   disabled skipping and type-ahead
//! - **Lifecycle** ([`lifecycle`]): open/close plus the "one open per screen" registry
//! - **Engine** ([`engine`]): the [`Dropdown`] that drives all of the above
//!
//! ## Example
//!
//! ```
//! use dropsel_core::{ExclusivityRegistry, InstanceKey, TaskQueue};
//! use dropsel_select::prelude::*;
//! use serde_json::json;
//!
//! let registry = ExclusivityRegistry::new();
//! let tasks = TaskQueue::new();
//!
//! let config = DropdownConfig::new()
//!     .searchable()
//!     .multiple()
//!     .content(vec![
//!         json!({"label": "Europe", "options": [
//!             {"value": "zh", "label": "Zürich"},
//!             {"value": "be", "label": "Bern"},
//!         ]}),
//!         json!({"value": "ny", "label": "New York"}),
//!     ]);
//!
//! let mut cities = Dropdown::new(InstanceKey::explicit("cities"), config, registry, tasks);
//! cities.open();
//! cities.set_search_term("zur");
//!
//! let view = cities.view();
//! assert_eq!(view.flat_options.len(), 1);
//! assert_eq!(view.display_list.len(), 1);
//! ```

pub mod config;
pub mod declarative;
pub mod engine;
pub mod filter;
pub mod flat;
pub mod form;
pub mod lifecycle;
pub mod navigation;
pub mod normalize;
pub mod option;
pub mod selection;
pub mod typeahead;

pub use config::{ConfigError, DropdownConfig};
pub use declarative::{ChildKey, DeclarativeTree, GroupRegistration, OptionRegistration};
pub use engine::{Dropdown, DropdownView, FocusCallback, Key, NavCommand, VIRTUALIZE_THRESHOLD};
pub use filter::{apply_filter, fold_for_search, FilterResult, SearchTerm};
pub use flat::{FlatOption, FlatOptions};
pub use form::{TouchedCallback, ValueAccessor, ValueChangeCallback};
pub use lifecycle::{Lifecycle, OpenEvent, OpenProbe, OpenState};
pub use navigation::{NavEvent, NavState, Navigator};
pub use normalize::{normalize, FieldSelectors, NormalizationSource};
pub use option::{CanonicalList, ListItem, OptionGroup, OptionValue, SelectOption};
pub use selection::{SelectionChange, SelectionMode, SelectionState, SelectionValue};
pub use typeahead::TypeaheadBuffer;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::DropdownConfig;
    pub use crate::declarative::{GroupRegistration, OptionRegistration};
    pub use crate::engine::{Dropdown, DropdownView, Key, NavCommand};
    pub use crate::form::ValueAccessor;
    pub use crate::option::{CanonicalList, ListItem, OptionGroup, SelectOption};
    pub use crate::selection::{SelectionMode, SelectionValue};
}
