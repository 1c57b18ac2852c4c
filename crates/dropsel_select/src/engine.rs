//! The dropdown engine
//!
//! [`Dropdown`] ties the pieces together for one widget instance:
//!
//! ```text
//! content / children ─▶ normalize ─▶ CanonicalList ─▶ apply_filter(term) ─┬─▶ display list
//!                                                                         └─▶ FlatOptions
//!                                                                               │
//!                                     Navigator (active index) ◀────────────────┤
//!                                     SelectionState (value)  ◀─────────────────┘
//! ```
//!
//! The presentation layer sends commands (`open`, `navigate`, `toggle`, ...)
//! and reads [`DropdownView`]. Every command runs to completion. The only
//! deferred work is the search-field focus request, queued on the shared
//! [`TaskQueue`] and invalidated when the session it belongs to ends.
//!
//! # Example
//!
//! ```
//! use dropsel_core::{ExclusivityRegistry, InstanceKey, TaskQueue};
//! use dropsel_select::{Dropdown, DropdownConfig, NavCommand};
//! use serde_json::json;
//!
//! let config = DropdownConfig::new().content(vec![
//!     json!({"id": "fr", "value": "fr", "label": "France"}),
//!     json!({"id": "de", "value": "de", "label": "Germany"}),
//! ]);
//! let mut dropdown = Dropdown::new(
//!     InstanceKey::explicit("country"),
//!     config,
//!     ExclusivityRegistry::new(),
//!     TaskQueue::new(),
//! );
//!
//! dropdown.open();
//! dropdown.navigate(NavCommand::Last);
//! dropdown.select_active();
//!
//! assert!(!dropdown.is_open());
//! assert_eq!(dropdown.display_text(), "Germany");
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use dropsel_core::{ExclusivityRegistry, InstanceKey, TaskHandle, TaskQueue};
use serde_json::Value;

use crate::config::DropdownConfig;
use crate::declarative::{ChildKey, DeclarativeTree, GroupRegistration, OptionRegistration};
use crate::filter::{apply_filter, FilterResult, SearchTerm};
use crate::flat::{FlatOption, FlatOptions};
use crate::form::{TouchedCallback, ValueAccessor, ValueChangeCallback};
use crate::lifecycle::Lifecycle;
use crate::navigation::Navigator;
use crate::normalize::{normalize, FieldSelectors, NormalizationSource};
use crate::option::{CanonicalList, SelectOption};
use crate::selection::{SelectionChange, SelectionMode, SelectionState, SelectionValue};

/// Above this many visible options the presentation should use a windowed list
pub const VIRTUALIZE_THRESHOLD: usize = 100;

/// Asks the presentation layer to focus the search field
pub type FocusCallback = Arc<dyn Fn() + Send + Sync>;

/// Cursor movement commands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavCommand {
    Next,
    Prev,
    First,
    Last,
    Typeahead(char),
}

/// Keys the engine interprets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Home,
    End,
    Enter,
    Space,
    Escape,
    Tab,
    Char(char),
}

impl Key {
    /// Parse a key name such as `"ArrowDown"`, `"esc"` or a single character
    pub fn parse(name: &str) -> Option<Self> {
        let key = match name.to_ascii_lowercase().as_str() {
            "arrowdown" | "down" => Key::ArrowDown,
            "arrowup" | "up" => Key::ArrowUp,
            "home" => Key::Home,
            "end" => Key::End,
            "enter" | "return" => Key::Enter,
            "space" => Key::Space,
            "escape" | "esc" => Key::Escape,
            "tab" => Key::Tab,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Key::Char(ch),
                    _ => return None,
                }
            }
        };
        Some(key)
    }
}

/// Read model for the presentation layer
#[derive(Clone, Copy, Debug)]
pub struct DropdownView<'a> {
    /// Filtered hierarchical list
    pub display_list: &'a CanonicalList,
    /// Navigation-order list of visible options
    pub flat_options: &'a FlatOptions,
    pub active_index: Option<usize>,
    pub is_open: bool,
    /// `flat_options.len() > VIRTUALIZE_THRESHOLD`
    pub use_virtualized_list: bool,
    selection: &'a SelectionState,
}

impl<'a> DropdownView<'a> {
    pub fn is_selected(&self, option: &SelectOption) -> bool {
        self.selection.is_selected(option)
    }

    pub fn active_option(&self) -> Option<&'a FlatOption> {
        self.active_index.and_then(|index| self.flat_options.get(index))
    }

    pub fn value(&self) -> &'a SelectionValue {
        self.selection.value()
    }
}

/// Headless dropdown engine for one widget instance
pub struct Dropdown {
    key: InstanceKey,
    config: DropdownConfig,
    fields: FieldSelectors,
    children: DeclarativeTree,
    /// Children version the canonical list was built from
    normalized_children: u64,
    canonical: CanonicalList,
    /// Every option, unfiltered, for addressing options by id
    all_options: FlatOptions,
    search: SearchTerm,
    filtered: FilterResult,
    selection: SelectionState,
    navigator: Navigator,
    lifecycle: Lifecycle,
    tasks: TaskQueue,
    focus_task: Option<TaskHandle>,
    on_change: Option<ValueChangeCallback>,
    on_touched: Option<TouchedCallback>,
    on_focus_search: Option<FocusCallback>,
    touched: bool,
    form_disabled: bool,
}

impl Dropdown {
    /// Create a closed dropdown subscribed to `registry`
    ///
    /// `tasks` is the host's deferred queue; the host drains it with
    /// [`TaskQueue::run_pending`] after each event.
    pub fn new(
        key: InstanceKey,
        config: DropdownConfig,
        registry: ExclusivityRegistry,
        tasks: TaskQueue,
    ) -> Self {
        let lifecycle = Lifecycle::new(key.get(), registry);
        let mut dropdown = Self {
            fields: config.field_selectors(),
            selection: SelectionState::new(config.selection_mode()),
            navigator: Navigator::new(config.typeahead_quiet_interval()),
            key,
            config,
            children: DeclarativeTree::new(),
            normalized_children: 0,
            canonical: CanonicalList::empty(),
            all_options: FlatOptions::default(),
            search: SearchTerm::default(),
            filtered: FilterResult::default(),
            lifecycle,
            tasks,
            focus_task: None,
            on_change: None,
            on_touched: None,
            on_focus_search: None,
            touched: false,
            form_disabled: false,
        };
        dropdown.renormalize();
        dropdown
    }

    // =========================================================================
    // Read model
    // =========================================================================

    pub fn key(&self) -> &InstanceKey {
        &self.key
    }

    pub fn config(&self) -> &DropdownConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle.is_open()
    }

    /// Disabled by config or by the form
    pub fn is_disabled(&self) -> bool {
        self.config.disabled || self.form_disabled
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn value(&self) -> &SelectionValue {
        self.selection.value()
    }

    pub fn search_term(&self) -> &str {
        self.search.raw()
    }

    /// Unfiltered canonical list
    pub fn canonical(&self) -> &CanonicalList {
        &self.canonical
    }

    /// Every option regardless of the search term
    pub fn all_options(&self) -> &FlatOptions {
        &self.all_options
    }

    pub fn children(&self) -> &DeclarativeTree {
        &self.children
    }

    pub fn view(&self) -> DropdownView<'_> {
        let is_open = self.is_open();
        let flat_options = &self.filtered.flat_options;
        DropdownView {
            display_list: &self.filtered.display_list,
            flat_options,
            active_index: if is_open { self.navigator.active_index() } else { None },
            is_open,
            use_virtualized_list: flat_options.len() > VIRTUALIZE_THRESHOLD,
            selection: &self.selection,
        }
    }

    /// Selected labels joined with ", ", or the placeholder
    pub fn display_text(&self) -> String {
        let labels: Vec<&str> = self
            .all_options
            .iter()
            .filter(|entry| self.selection.is_selected(&entry.option))
            .map(|entry| entry.option.label.as_str())
            .collect();

        if labels.is_empty() {
            self.config.placeholder.clone()
        } else {
            labels.join(", ")
        }
    }

    // =========================================================================
    // Lifecycle commands
    // =========================================================================

    /// Apply a dismissal by a sibling, if one happened. Returns true if it did.
    ///
    /// Every command calls this first; hosts call it before rendering.
    pub fn reconcile(&mut self) -> bool {
        if !self.lifecycle.take_dismissed() {
            return false;
        }
        tracing::debug!("Dropdown::reconcile - {} dismissed", self.key.get());
        self.finish_close();
        true
    }

    /// Open the panel. Refused while disabled.
    pub fn open(&mut self) -> bool {
        self.reconcile();
        if self.is_disabled() {
            tracing::debug!("Dropdown::open - {} refused, disabled", self.key.get());
            return false;
        }
        if !self.lifecycle.open() {
            return false;
        }

        self.search = SearchTerm::default();
        self.refilter();
        let seed = self.selected_position();
        self.navigator.open(&self.filtered.flat_options, seed);

        if self.config.searchable {
            self.schedule_focus();
        }

        tracing::debug!(
            "Dropdown::open - {} ({} options, active {:?})",
            self.key.get(),
            self.filtered.flat_options.len(),
            self.navigator.active_index()
        );
        true
    }

    /// Close the panel (a user interaction: marks the control touched)
    pub fn close(&mut self) -> bool {
        self.reconcile();
        if !self.close_silently() {
            return false;
        }
        self.mark_touched();
        true
    }

    /// Leave the registry and cancel deferred work. The dropdown stays
    /// readable but can no longer open.
    pub fn dispose(&mut self) {
        if let Some(task) = self.focus_task.take() {
            task.cancel();
        }
        self.navigator.close();
        self.lifecycle.dispose();
    }

    fn close_silently(&mut self) -> bool {
        if !self.lifecycle.close() {
            return false;
        }
        self.finish_close();
        tracing::debug!("Dropdown::close - {}", self.key.get());
        true
    }

    fn finish_close(&mut self) {
        self.navigator.close();
        if let Some(task) = self.focus_task.take() {
            task.cancel();
        }
        if !self.search.raw().is_empty() {
            self.search = SearchTerm::default();
            self.refilter();
        }
    }

    fn schedule_focus(&mut self) {
        if let Some(task) = self.focus_task.take() {
            task.cancel();
        }
        let Some(focus) = self.on_focus_search.clone() else {
            return;
        };
        let probe = self.lifecycle.probe();
        self.focus_task = Some(self.tasks.schedule(move || {
            if probe.is_current() {
                focus();
            }
        }));
    }

    // =========================================================================
    // Search and navigation
    // =========================================================================

    /// Filter the open panel. Ignored unless searchable and open.
    pub fn set_search_term(&mut self, text: &str) -> bool {
        self.reconcile();
        if !self.config.searchable || !self.is_open() {
            return false;
        }
        let term = SearchTerm::new(text);
        if term == self.search {
            return false;
        }
        self.search = term;
        self.refilter();
        true
    }

    /// Move the cursor. Returns true if it moved.
    pub fn navigate(&mut self, command: NavCommand) -> bool {
        self.navigate_at(command, Instant::now())
    }

    /// [`navigate`](Self::navigate) with an explicit type-ahead timestamp
    pub fn navigate_at(&mut self, command: NavCommand, now: Instant) -> bool {
        self.reconcile();
        if !self.is_open() {
            return false;
        }
        let flat = &self.filtered.flat_options;
        match command {
            NavCommand::Next => self.navigator.next(flat),
            NavCommand::Prev => self.navigator.prev(flat),
            NavCommand::First => self.navigator.first(flat),
            NavCommand::Last => self.navigator.last(flat),
            NavCommand::Typeahead(ch) => self.navigator.typeahead(ch, now, flat),
        }
    }

    /// Interpret a key. Returns true if the key was consumed.
    pub fn handle_key(&mut self, key: Key) -> bool {
        self.handle_key_at(key, Instant::now())
    }

    /// [`handle_key`](Self::handle_key) with an explicit timestamp
    pub fn handle_key_at(&mut self, key: Key, now: Instant) -> bool {
        self.reconcile();
        if self.is_disabled() {
            return false;
        }
        let open = self.is_open();

        match key {
            Key::ArrowDown | Key::ArrowUp | Key::Enter | Key::Space if !open => self.open(),
            Key::Home | Key::End | Key::Escape | Key::Tab | Key::Char(_) if !open => false,

            Key::ArrowDown => self.consume(NavCommand::Next, now),
            Key::ArrowUp => self.consume(NavCommand::Prev, now),
            Key::Home => self.consume(NavCommand::First, now),
            Key::End => self.consume(NavCommand::Last, now),

            // Searchable panels route text to the search field
            Key::Space | Key::Char(_) if self.config.searchable => false,
            Key::Char(ch) => self.consume(NavCommand::Typeahead(ch), now),
            Key::Enter | Key::Space => {
                self.select_active();
                true
            }
            Key::Escape | Key::Tab => self.close(),
        }
    }

    fn consume(&mut self, command: NavCommand, now: Instant) -> bool {
        self.navigate_at(command, now);
        true
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Toggle the active option. No-op without an enabled active option.
    pub fn select_active(&mut self) -> bool {
        self.reconcile();
        if !self.is_open() {
            return false;
        }
        let Some(entry) = self
            .navigator
            .active_index()
            .and_then(|index| self.filtered.flat_options.get(index))
            .cloned()
        else {
            return false;
        };
        self.toggle_entry(&entry)
    }

    /// Toggle the option with `id`, visible or not. Unknown ids are ignored.
    pub fn toggle(&mut self, id: &str) -> bool {
        self.reconcile();
        let Some(entry) = self.all_options.find(id).cloned() else {
            tracing::trace!("Dropdown::toggle - {} unknown option {}", self.key.get(), id);
            return false;
        };
        self.toggle_entry(&entry)
    }

    /// Reset to "no value" and close. Returns true if the value changed.
    pub fn clear(&mut self) -> bool {
        self.reconcile();
        if self.is_disabled() {
            return false;
        }
        self.mark_touched();
        let change = self.selection.clear();
        if let SelectionChange::Changed(value) = &change {
            self.emit_change(value);
        }
        self.close_silently();
        change.is_changed()
    }

    fn toggle_entry(&mut self, entry: &FlatOption) -> bool {
        if self.is_disabled() || entry.disabled {
            return false;
        }
        self.mark_touched();

        let SelectionChange::Changed(value) = self.selection.toggle(entry) else {
            return false;
        };
        tracing::debug!(
            "Dropdown::toggle - {} {} -> {} selected",
            self.key.get(),
            entry.option.id,
            value.len()
        );
        self.emit_change(&value);

        if self.selection.closes_on_toggle() {
            self.close_silently();
        } else if let Some(index) = self.filtered.flat_options.position_of(&entry.option.id) {
            self.navigator.jump(&self.filtered.flat_options, index);
        }
        true
    }

    fn selected_position(&self) -> Option<usize> {
        self.filtered
            .flat_options
            .iter()
            .position(|entry| !entry.disabled && self.selection.is_selected(&entry.option))
    }

    fn emit_change(&mut self, value: &SelectionValue) {
        if let Some(callback) = self.on_change.as_mut() {
            callback(value);
        }
    }

    fn mark_touched(&mut self) {
        if self.touched {
            return;
        }
        self.touched = true;
        if let Some(callback) = self.on_touched.as_mut() {
            callback();
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Replace array-mode content. `None` switches to declarative children.
    pub fn set_content(&mut self, content: Option<Vec<Value>>) {
        self.config.content = content;
        self.renormalize();
    }

    pub fn set_field_selectors(&mut self, fields: FieldSelectors) {
        if fields == self.fields {
            return;
        }
        self.config.value_field = fields.value_field.clone();
        self.config.label_field = fields.label_field.clone();
        self.fields = fields;
        self.renormalize();
    }

    pub fn set_multiple(&mut self, multiple: bool) {
        self.config.multiple = multiple;
        self.selection
            .set_mode(SelectionMode::from_multiple(multiple), &self.all_options);
    }

    pub fn set_searchable(&mut self, searchable: bool) {
        self.config.searchable = searchable;
        if !searchable && !self.search.raw().is_empty() {
            self.search = SearchTerm::default();
            self.refilter();
        }
    }

    /// Config-level disable. Closes an open panel.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.config.disabled = disabled;
        if disabled {
            self.reconcile();
            self.close_silently();
        }
    }

    pub fn set_placeholder(&mut self, placeholder: impl Into<String>) {
        self.config.placeholder = placeholder.into();
    }

    pub fn set_typeahead_quiet(&mut self, quiet: Duration) {
        self.config.typeahead_quiet_ms = quiet.as_millis() as u64;
        self.navigator.set_typeahead_quiet(quiet);
    }

    /// Register the callback a deferred focus task invokes after opening
    pub fn on_focus_search<F>(&mut self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_focus_search = Some(Arc::new(callback));
    }

    // =========================================================================
    // Declarative children
    // =========================================================================

    pub fn register_option(&mut self, option: OptionRegistration) -> ChildKey {
        let key = self.children.register_option(option);
        self.sync_children();
        key
    }

    pub fn register_group(
        &mut self,
        group: GroupRegistration,
        claims: impl IntoIterator<Item = ChildKey>,
    ) -> ChildKey {
        let key = self.children.register_group(group, claims);
        self.sync_children();
        key
    }

    pub fn claim(&mut self, group: ChildKey, option: ChildKey) -> bool {
        let claimed = self.children.claim(group, option);
        self.sync_children();
        claimed
    }

    pub fn unregister(&mut self, key: ChildKey) -> bool {
        let removed = self.children.unregister(key);
        self.sync_children();
        removed
    }

    fn sync_children(&mut self) {
        if self.children.version() == self.normalized_children {
            return;
        }
        if self.config.content.is_some() {
            // Array content wins; children are ignored
            self.normalized_children = self.children.version();
            return;
        }
        self.renormalize();
    }

    // =========================================================================
    // Derivation
    // =========================================================================

    fn renormalize(&mut self) {
        let source = NormalizationSource::resolve(
            self.config.content.as_deref(),
            &self.fields,
            &self.children,
        );
        self.canonical = normalize(source);
        self.all_options = self.canonical.leaves().map(FlatOption::from).collect();
        self.selection.anchor(&self.all_options);
        self.normalized_children = self.children.version();
        self.refilter();
    }

    fn refilter(&mut self) {
        self.filtered = apply_filter(&self.canonical, self.search.raw());
        if self.navigator.is_open() {
            self.navigator.revalidate(&self.filtered.flat_options);
        }
    }
}

impl ValueAccessor for Dropdown {
    fn write_value(&mut self, value: Value) {
        self.selection.write(value, &self.all_options);
        tracing::debug!(
            "Dropdown::write_value - {} now holds {} values",
            self.key.get(),
            self.selection.value().len()
        );
    }

    fn on_value_change(&mut self, callback: ValueChangeCallback) {
        self.on_change = Some(callback);
    }

    fn on_touched(&mut self, callback: TouchedCallback) {
        self.on_touched = Some(callback);
    }

    fn set_disabled_state(&mut self, disabled: bool) {
        self.form_disabled = disabled;
        if disabled {
            self.reconcile();
            self.close_silently();
        }
    }
}

impl std::fmt::Debug for Dropdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dropdown")
            .field("key", &self.key)
            .field("open", &self.is_open())
            .field("options", &self.all_options.len())
            .field("visible", &self.filtered.flat_options.len())
            .field("search", &self.search.raw())
            .field("value", self.selection.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn letters() -> Vec<Value> {
        vec![
            json!({"id": "g1", "label": "Letters", "options": [
                {"id": "o1", "value": 1, "label": "Alpha"},
                {"id": "o2", "value": 2, "label": "Beta"},
            ]}),
            json!({"id": "o3", "value": 3, "label": "Gamma"}),
        ]
    }

    fn dropdown(config: DropdownConfig) -> Dropdown {
        Dropdown::new(
            InstanceKey::explicit("test"),
            config,
            ExclusivityRegistry::new(),
            TaskQueue::new(),
        )
    }

    fn active_id(dropdown: &Dropdown) -> Option<String> {
        dropdown
            .view()
            .active_option()
            .map(|entry| entry.option.id.clone())
    }

    fn visible_ids(dropdown: &Dropdown) -> Vec<String> {
        dropdown
            .view()
            .flat_options
            .iter()
            .map(|entry| entry.option.id.clone())
            .collect()
    }

    fn record_changes(dropdown: &mut Dropdown) -> Arc<Mutex<Vec<SelectionValue>>> {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        dropdown.on_value_change(Box::new(move |value| {
            sink.lock().unwrap().push(value.clone());
        }));
        changes
    }

    #[test]
    fn test_search_and_wrap_scenario() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()).searchable());
        assert!(dd.open());
        assert_eq!(visible_ids(&dd), vec!["o1", "o2", "o3"]);

        dd.set_search_term("a");
        // "Beta" contains an "a" as well
        assert_eq!(visible_ids(&dd), vec!["o1", "o2", "o3"]);

        dd.set_search_term("ma");
        assert_eq!(visible_ids(&dd), vec!["o3"]);
        assert_eq!(dd.view().display_list.len(), 1);

        dd.set_search_term("");
        assert_eq!(visible_ids(&dd), vec!["o1", "o2", "o3"]);
        assert_eq!(dd.view().active_index, None);

        dd.navigate(NavCommand::Next);
        assert_eq!(active_id(&dd).as_deref(), Some("o1"));
        dd.navigate(NavCommand::Next);
        dd.navigate(NavCommand::Next);
        assert_eq!(active_id(&dd).as_deref(), Some("o3"));
        dd.navigate(NavCommand::Next);
        assert_eq!(dd.view().active_index, Some(0));
    }

    #[test]
    fn test_filter_rebuild_revalidates_cursor() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()).searchable());
        dd.open();
        dd.navigate(NavCommand::Last);
        assert_eq!(active_id(&dd).as_deref(), Some("o3"));

        // Still present: cursor follows to its new index
        dd.set_search_term("gam");
        assert_eq!(dd.view().active_index, Some(0));

        // Gone: cursor resets to none, not to 0
        dd.set_search_term("alp");
        assert_eq!(visible_ids(&dd), vec!["o1"]);
        assert_eq!(dd.view().active_index, None);
    }

    #[test]
    fn test_search_requires_searchable_and_open() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()));
        dd.open();
        assert!(!dd.set_search_term("gam"));
        assert_eq!(visible_ids(&dd).len(), 3);

        let mut dd = dropdown(DropdownConfig::new().content(letters()).searchable());
        assert!(!dd.set_search_term("gam"));
    }

    #[test]
    fn test_close_resets_search() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()).searchable());
        dd.open();
        dd.set_search_term("gam");
        dd.close();
        assert_eq!(dd.search_term(), "");
        assert_eq!(visible_ids(&dd).len(), 3);
    }

    #[test]
    fn test_single_select_closes_and_emits() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()));
        let changes = record_changes(&mut dd);

        dd.open();
        dd.navigate(NavCommand::Next);
        assert!(dd.select_active());
        assert!(!dd.is_open());
        assert_eq!(dd.value(), &SelectionValue::Single(Some(json!(1))));
        assert_eq!(changes.lock().unwrap().len(), 1);
        assert_eq!(dd.display_text(), "Alpha");
    }

    #[test]
    fn test_single_shared_value_selects_one_option() {
        let content = vec![
            json!({"id": "a", "value": 1, "label": "First"}),
            json!({"id": "b", "value": 1, "label": "Second"}),
        ];
        let mut dd = dropdown(DropdownConfig::new().content(content));

        let selected = |dd: &Dropdown| -> Vec<String> {
            let view = dd.view();
            view.flat_options
                .iter()
                .filter(|entry| view.is_selected(&entry.option))
                .map(|entry| entry.option.id.clone())
                .collect()
        };

        assert!(dd.toggle("b"));
        assert_eq!(selected(&dd), vec!["b"]);
        assert_eq!(dd.display_text(), "Second");

        // An external write belongs to the first option with the value
        dd.write_value(json!(1));
        assert_eq!(selected(&dd), vec!["a"]);

        dd.open();
        assert_eq!(active_id(&dd).as_deref(), Some("a"));
    }

    #[test]
    fn test_select_active_without_cursor_is_ignored() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()));
        let changes = record_changes(&mut dd);

        dd.open();
        assert_eq!(dd.view().active_index, None);
        assert!(!dd.select_active());
        assert!(dd.is_open());
        assert!(dd.value().is_empty());
        assert!(changes.lock().unwrap().is_empty());
        assert!(!dd.is_touched());
    }

    #[test]
    fn test_select_active_after_rebuild_drops_cursor() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()).searchable());
        let changes = record_changes(&mut dd);

        dd.open();
        dd.navigate(NavCommand::Next);
        assert_eq!(active_id(&dd).as_deref(), Some("o1"));

        dd.set_search_term("gam");
        assert_eq!(dd.view().active_index, None);
        assert!(!dd.select_active());
        assert!(dd.value().is_empty());
        assert!(changes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_toggle_unknown_id_is_ignored() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()));
        let changes = record_changes(&mut dd);

        dd.open();
        assert!(!dd.toggle("missing"));
        assert!(dd.is_open());
        assert!(dd.value().is_empty());
        assert!(changes.lock().unwrap().is_empty());
        assert!(!dd.is_touched());
    }

    #[test]
    fn test_reopen_seeds_cursor_on_selection() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()));
        dd.toggle("o3");
        dd.open();
        assert_eq!(active_id(&dd).as_deref(), Some("o3"));
    }

    #[test]
    fn test_multi_toggle_keeps_open() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()).multiple());
        let changes = record_changes(&mut dd);

        dd.open();
        dd.toggle("o1");
        dd.toggle("o2");
        dd.toggle("o1");
        assert!(dd.is_open());
        assert_eq!(dd.value(), &SelectionValue::Multiple(vec![json!(2)]));
        assert_eq!(changes.lock().unwrap().len(), 3);
        // Cursor follows the toggled option
        assert_eq!(active_id(&dd).as_deref(), Some("o1"));
        assert_eq!(dd.display_text(), "Beta");
    }

    #[test]
    fn test_toggle_hidden_option_by_id() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()).searchable().multiple());
        dd.open();
        dd.set_search_term("gam");
        assert!(dd.toggle("o1"));
        assert!(dd.value().contains(&json!(1)));
        assert_eq!(dd.view().active_index, None);
    }

    #[test]
    fn test_disabled_option_is_inert() {
        let content = vec![
            json!({"id": "a", "value": 1, "label": "A"}),
            json!({"id": "b", "value": 2, "label": "B", "disabled": true}),
        ];
        let mut dd = dropdown(DropdownConfig::new().content(content));
        let changes = record_changes(&mut dd);

        dd.open();
        assert!(!dd.toggle("b"));
        assert!(dd.value().is_empty());
        assert!(dd.is_open());
        assert!(changes.lock().unwrap().is_empty());
        assert!(!dd.is_touched());
    }

    #[test]
    fn test_group_disabled_propagates() {
        let content = vec![json!({"id": "g", "label": "G", "disabled": true, "options": [
            {"id": "a", "value": 1, "label": "A"}
        ]})];
        let mut dd = dropdown(DropdownConfig::new().content(content));
        dd.open();
        assert!(!dd.navigate(NavCommand::Next));
        assert!(!dd.toggle("a"));
    }

    #[test]
    fn test_clear() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()).multiple());
        let changes = record_changes(&mut dd);

        dd.open();
        assert!(!dd.clear());
        assert!(!dd.is_open());
        assert!(changes.lock().unwrap().is_empty());

        dd.toggle("o1");
        dd.open();
        assert!(dd.clear());
        assert!(!dd.is_open());
        assert_eq!(dd.value(), &SelectionValue::Multiple(vec![]));
        assert_eq!(changes.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_write_value_does_not_emit() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()).multiple());
        let changes = record_changes(&mut dd);

        dd.write_value(json!([3, 1, 3]));
        assert_eq!(dd.value().values(), &[json!(3), json!(1)]);
        assert!(changes.lock().unwrap().is_empty());
        assert!(!dd.is_touched());
        assert_eq!(dd.display_text(), "Alpha, Gamma");
    }

    #[test]
    fn test_touched_fires_once() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()));
        let touches = Arc::new(AtomicUsize::new(0));
        let count = touches.clone();
        dd.on_touched(Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        }));

        dd.open();
        assert_eq!(touches.load(Ordering::SeqCst), 0);
        dd.close();
        dd.toggle("o1");
        dd.clear();
        assert_eq!(touches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_form_disabled_state() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()));
        dd.write_value(json!(2));
        dd.open();

        dd.set_disabled_state(true);
        assert!(!dd.is_open());
        assert!(!dd.open());
        assert!(!dd.toggle("o1"));
        assert!(!dd.clear());
        assert!(!dd.handle_key(Key::ArrowDown));
        assert_eq!(dd.value(), &SelectionValue::Single(Some(json!(2))));

        dd.set_disabled_state(false);
        assert!(dd.open());
    }

    #[test]
    fn test_config_disabled_refuses_open() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()).disabled());
        assert!(!dd.open());
        dd.set_disabled(false);
        assert!(dd.open());
        dd.set_disabled(true);
        assert!(!dd.is_open());
    }

    #[test]
    fn test_exclusivity_between_instances() {
        let registry = ExclusivityRegistry::new();
        let tasks = TaskQueue::new();
        let config = DropdownConfig::new().content(letters());
        let mut a = Dropdown::new(InstanceKey::explicit("a"), config.clone(), registry.clone(), tasks.clone());
        let mut b = Dropdown::new(InstanceKey::explicit("b"), config, registry.clone(), tasks);

        a.open();
        a.navigate(NavCommand::Next);
        b.open();
        assert!(!a.is_open());
        assert!(b.is_open());
        assert_eq!(a.view().active_index, None);

        assert!(a.reconcile());
        assert!(!a.reconcile());

        // Reopening b changes nothing for a
        assert!(!b.open());
        assert!(!a.reconcile());
    }

    #[test]
    fn test_dispose_leaves_registry() {
        let registry = ExclusivityRegistry::new();
        let mut a = Dropdown::new(
            InstanceKey::explicit("a"),
            DropdownConfig::new(),
            registry.clone(),
            TaskQueue::new(),
        );
        a.open();
        a.dispose();
        assert!(!a.is_open());
        assert_eq!(registry.subscriber_count(), 0);
        assert!(!a.open());
    }

    #[test]
    fn test_focus_task_rechecks_open_state() {
        let tasks = TaskQueue::new();
        let mut dd = Dropdown::new(
            InstanceKey::explicit("search"),
            DropdownConfig::new().content(letters()).searchable(),
            ExclusivityRegistry::new(),
            tasks.clone(),
        );
        let focused = Arc::new(AtomicUsize::new(0));
        let count = focused.clone();
        dd.on_focus_search(move || {
            count.fetch_add(1, Ordering::SeqCst);
        });

        // Rapid open/close: the deferred focus never runs
        dd.open();
        dd.close();
        tasks.run_pending();
        assert_eq!(focused.load(Ordering::SeqCst), 0);

        dd.open();
        tasks.run_pending();
        assert_eq!(focused.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_focus_not_scheduled_when_not_searchable() {
        let tasks = TaskQueue::new();
        let mut dd = Dropdown::new(
            InstanceKey::explicit("plain"),
            DropdownConfig::new().content(letters()),
            ExclusivityRegistry::new(),
            tasks.clone(),
        );
        dd.on_focus_search(|| {});
        dd.open();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_handle_key_table() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()));

        assert!(!dd.handle_key(Key::Escape));
        assert!(!dd.handle_key(Key::Home));
        assert!(dd.handle_key(Key::ArrowDown));
        assert!(dd.is_open());

        dd.handle_key(Key::ArrowDown);
        assert_eq!(active_id(&dd).as_deref(), Some("o1"));
        dd.handle_key(Key::End);
        assert_eq!(active_id(&dd).as_deref(), Some("o3"));
        dd.handle_key(Key::ArrowDown);
        assert_eq!(active_id(&dd).as_deref(), Some("o1"));
        dd.handle_key(Key::ArrowUp);
        assert_eq!(active_id(&dd).as_deref(), Some("o3"));

        let now = Instant::now();
        dd.handle_key_at(Key::Char('b'), now);
        assert_eq!(active_id(&dd).as_deref(), Some("o2"));

        assert!(dd.handle_key(Key::Enter));
        assert!(!dd.is_open());
        assert_eq!(dd.value(), &SelectionValue::Single(Some(json!(2))));

        dd.handle_key(Key::Space);
        assert!(dd.is_open());
        assert!(dd.handle_key(Key::Tab));
        assert!(!dd.is_open());
    }

    #[test]
    fn test_searchable_keeps_text_keys_for_search_field() {
        let mut dd = dropdown(DropdownConfig::new().content(letters()).searchable());
        dd.open();
        assert!(!dd.handle_key(Key::Char('g')));
        assert!(!dd.handle_key(Key::Space));
        assert_eq!(dd.view().active_index, None);
    }

    #[test]
    fn test_key_parse() {
        assert_eq!(Key::parse("ArrowDown"), Some(Key::ArrowDown));
        assert_eq!(Key::parse("esc"), Some(Key::Escape));
        assert_eq!(Key::parse("x"), Some(Key::Char('x')));
        assert_eq!(Key::parse("nope"), None);
    }

    #[test]
    fn test_virtualization_threshold() {
        let records = |n: usize| (0..n).map(|i| json!(i)).collect::<Vec<_>>();

        let dd = dropdown(DropdownConfig::new().content(records(VIRTUALIZE_THRESHOLD)));
        assert!(!dd.view().use_virtualized_list);

        let dd = dropdown(DropdownConfig::new().content(records(VIRTUALIZE_THRESHOLD + 1)));
        assert!(dd.view().use_virtualized_list);
    }

    #[test]
    fn test_declarative_children() {
        let mut dd = dropdown(DropdownConfig::new().placeholder("Pick"));
        assert!(dd.canonical().is_empty());
        assert_eq!(dd.display_text(), "Pick");

        let a = dd.register_option(OptionRegistration::new("a", "Apple").with_id("a"));
        let b = dd.register_option(OptionRegistration::new("b", "Banana").with_id("b"));
        dd.register_option(OptionRegistration::new("c", "Cherry").with_id("c"));
        let fruit = dd.register_group(GroupRegistration::new("Fruit").with_id("fruit"), [a, b]);

        let ids: Vec<_> = dd.canonical().items().iter().map(|item| item.id().to_string()).collect();
        assert_eq!(ids, vec!["c", "fruit"]);
        assert_eq!(dd.all_options().len(), 3);

        dd.unregister(fruit);
        assert_eq!(dd.all_options().len(), 1);
    }

    #[test]
    fn test_unregister_group_keeps_earlier_groups_options() {
        let mut dd = dropdown(DropdownConfig::new());
        let a = dd.register_option(OptionRegistration::new("a", "Apple").with_id("a"));
        let b = dd.register_option(OptionRegistration::new("b", "Banana").with_id("b"));
        dd.register_group(GroupRegistration::new("First").with_id("g1"), [a]);
        let g2 = dd.register_group(GroupRegistration::new("Second").with_id("g2"), [a, b]);

        assert!(dd.unregister(g2));
        let ids: Vec<_> = dd.all_options().iter().map(|e| e.option.id.clone()).collect();
        assert_eq!(ids, vec!["a"]);
        let groups: Vec<_> = dd.canonical().items().iter().map(|item| item.id().to_string()).collect();
        assert_eq!(groups, vec!["g1"]);
    }

    #[test]
    fn test_content_overrides_children() {
        let mut dd = dropdown(DropdownConfig::new().content(vec![]));
        dd.register_option(OptionRegistration::new(1, "Ignored"));
        assert!(dd.canonical().is_empty());

        dd.set_content(None);
        assert_eq!(dd.all_options().len(), 1);

        dd.set_content(Some(letters()));
        assert_eq!(dd.all_options().len(), 3);
    }

    #[test]
    fn test_renormalize_keeps_selection_by_value() {
        let mut dd = dropdown(DropdownConfig::new().content(vec![json!({"value": 1, "label": "One"})]));
        let id = dd.all_options().get(0).map(|e| e.option.id.clone()).unwrap();
        dd.toggle(&id);

        dd.set_content(Some(vec![json!({"value": 1, "label": "One again"})]));
        assert_ne!(dd.all_options().get(0).map(|e| e.option.id.clone()), Some(id));
        assert_eq!(dd.display_text(), "One again");
    }

    #[test]
    fn test_field_selectors() {
        let mut dd = dropdown(
            DropdownConfig::new().content(vec![json!({"id": "x", "code": "de", "name": "Germany"})]),
        );
        assert_eq!(dd.all_options().get(0).map(|e| e.option.label.as_str()), Some("-"));

        dd.set_field_selectors(FieldSelectors::new("code", "name"));
        let entry = dd.all_options().get(0).cloned().unwrap();
        assert_eq!(entry.option.label, "Germany");
        assert_eq!(entry.option.value, json!("de"));
    }
}
