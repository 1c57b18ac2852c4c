//! Search filter - folds labels and terms, derives group visibility
//!
//! Matching is a substring test after folding both sides: NFD decomposition,
//! combining marks stripped, then lower-cased. "Zürich" matches "zur".
//!
//! Filtering is always computed from canonical data, never from a previously
//! filtered result, so clearing the term restores full visibility.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::flat::{FlatOption, FlatOptions};
use crate::option::{CanonicalList, ListItem, OptionGroup};

/// Fold text for case- and diacritic-insensitive comparison
pub fn fold_for_search(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// A folded search term
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchTerm {
    raw: String,
    folded: String,
}

impl SearchTerm {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let folded = fold_for_search(&raw);
        Self { raw, folded }
    }

    /// The term as typed
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// An empty term matches everything
    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }

    pub fn matches(&self, label: &str) -> bool {
        self.is_empty() || fold_for_search(label).contains(&self.folded)
    }
}

/// Output of [`apply_filter`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterResult {
    /// Filtered hierarchical list for display
    pub display_list: CanonicalList,
    /// Navigation-order list of matching options
    pub flat_options: FlatOptions,
}

/// Filter `canonical` by `term`
///
/// Groups survive only when at least one child matches, and keep only their
/// matching children. Groups that start out empty never survive.
pub fn apply_filter(canonical: &CanonicalList, term: &str) -> FilterResult {
    let term = SearchTerm::new(term);
    let mut display = Vec::with_capacity(canonical.len());
    let mut flat = Vec::new();

    for item in canonical.items() {
        match item {
            ListItem::Option(option) => {
                if term.matches(&option.label) {
                    flat.push(FlatOption {
                        option: option.clone(),
                        disabled: option.disabled,
                    });
                    display.push(ListItem::Option(option.clone()));
                }
            }
            ListItem::Group(group) => {
                let matching: Vec<_> = group
                    .options
                    .iter()
                    .filter(|option| term.matches(&option.label))
                    .cloned()
                    .collect();
                if matching.is_empty() {
                    continue;
                }
                flat.extend(matching.iter().map(|option| FlatOption {
                    option: option.clone(),
                    disabled: group.is_option_disabled(option),
                }));
                display.push(ListItem::Group(OptionGroup {
                    id: group.id.clone(),
                    label: group.label.clone(),
                    disabled: group.disabled,
                    options: matching,
                }));
            }
        }
    }

    tracing::trace!(
        "apply_filter {:?}: {} of {} options visible",
        term.raw(),
        flat.len(),
        canonical.option_count()
    );

    FilterResult {
        display_list: CanonicalList::new(display),
        flat_options: FlatOptions::new(flat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::SelectOption;

    fn sample() -> CanonicalList {
        CanonicalList::new(vec![
            OptionGroup::new("g1", "Letters")
                .option(SelectOption::new("o1", 1, "Alpha"))
                .option(SelectOption::new("o2", 2, "Beta"))
                .into(),
            SelectOption::new("o3", 3, "Gamma").into(),
        ])
    }

    fn ids(result: &FilterResult) -> Vec<&str> {
        result
            .flat_options
            .iter()
            .map(|entry| entry.option.id.as_str())
            .collect()
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold_for_search("Zürich"), "zurich");
        assert_eq!(fold_for_search("CRÈME Brûlée"), "creme brulee");
        assert_eq!(fold_for_search("e\u{0301}"), "e");
    }

    #[test]
    fn test_empty_term_matches_everything() {
        let result = apply_filter(&sample(), "");
        assert_eq!(ids(&result), vec!["o1", "o2", "o3"]);
        assert_eq!(result.display_list, sample());
    }

    #[test]
    fn test_case_insensitive_a() {
        let result = apply_filter(&sample(), "a");
        // Beta contains "a" too
        assert_eq!(ids(&result), vec!["o1", "o2", "o3"]);

        let result = apply_filter(&sample(), "AL");
        assert_eq!(ids(&result), vec!["o1"]);
    }

    #[test]
    fn test_group_keeps_only_matching_children() {
        let canonical = CanonicalList::new(vec![OptionGroup::new("g", "G")
            .option(SelectOption::new("x", 1, "Abacus"))
            .option(SelectOption::new("y", 2, "Cedar"))
            .option(SelectOption::new("z", 3, "Delta"))
            .into()]);

        let result = apply_filter(&canonical, "ab");
        assert_eq!(result.display_list.len(), 1);
        let ListItem::Group(group) = &result.display_list.items()[0] else {
            panic!("expected group");
        };
        assert_eq!(group.options.len(), 1);
        assert_eq!(group.options[0].id, "x");
    }

    #[test]
    fn test_group_without_matches_is_dropped() {
        let result = apply_filter(&sample(), "gam");
        assert_eq!(result.display_list.len(), 1);
        assert!(matches!(&result.display_list.items()[0], ListItem::Option(o) if o.id == "o3"));
    }

    #[test]
    fn test_empty_group_never_retained() {
        let canonical = CanonicalList::new(vec![
            OptionGroup::new("empty", "Empty").into(),
            SelectOption::new("a", 1, "A").into(),
        ]);
        let result = apply_filter(&canonical, "");
        assert_eq!(result.display_list.len(), 1);
        assert_eq!(result.display_list.items()[0].id(), "a");
    }

    #[test]
    fn test_diacritic_insensitive_match() {
        let canonical = CanonicalList::new(vec![
            SelectOption::new("zh", "zh", "Zürich").into(),
            SelectOption::new("be", "be", "Bern").into(),
        ]);
        assert_eq!(ids(&apply_filter(&canonical, "zur")), vec!["zh"]);
        assert_eq!(ids(&apply_filter(&canonical, "ZÜR")), vec!["zh"]);
    }

    #[test]
    fn test_group_disabled_is_resolved_in_flat_list() {
        let canonical = CanonicalList::new(vec![OptionGroup::new("g", "G")
            .disabled()
            .option(SelectOption::new("a", 1, "A"))
            .into()]);
        let result = apply_filter(&canonical, "");
        assert!(result.flat_options.get(0).is_some_and(|e| e.disabled));
    }

    #[test]
    fn test_refilter_from_canonical_restores_all() {
        let canonical = sample();
        let narrowed = apply_filter(&canonical, "gam");
        assert_eq!(narrowed.flat_options.len(), 1);
        let restored = apply_filter(&canonical, "");
        assert_eq!(restored.flat_options.len(), 3);
    }
}
