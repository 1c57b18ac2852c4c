//! Type-ahead buffer for non-searchable dropdowns
//!
//! Printable keys accumulate into a short-lived buffer. After a quiet
//! interval with no input the buffer starts over, so typing "b" then pausing
//! then "c" searches for "c", while typing "br" quickly searches for "br".

use std::time::{Duration, Instant};

use crate::filter::fold_for_search;
use crate::flat::FlatOptions;

/// Default quiet interval after which the buffer resets
pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_millis(500);

/// Accumulates recently typed characters
#[derive(Clone, Debug)]
pub struct TypeaheadBuffer {
    buffer: String,
    last_input: Option<Instant>,
    quiet: Duration,
}

impl Default for TypeaheadBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_INTERVAL)
    }
}

impl TypeaheadBuffer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            buffer: String::new(),
            last_input: None,
            quiet,
        }
    }

    pub fn set_quiet_interval(&mut self, quiet: Duration) {
        self.quiet = quiet;
    }

    /// Append `ch` typed at `now` and return the current buffer
    pub fn push(&mut self, ch: char, now: Instant) -> &str {
        let expired = self
            .last_input
            .map_or(true, |last| now.saturating_duration_since(last) > self.quiet);
        if expired {
            self.buffer.clear();
        }
        self.buffer.push(ch);
        self.last_input = Some(now);
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_input = None;
    }
}

/// Index of the first enabled option whose label starts with `prefix`
///
/// Comparison uses the same folding as the search filter.
pub fn find_prefix_match(flat: &FlatOptions, prefix: &str) -> Option<usize> {
    let prefix = fold_for_search(prefix);
    if prefix.is_empty() {
        return None;
    }
    flat.iter()
        .position(|entry| !entry.disabled && fold_for_search(&entry.option.label).starts_with(&prefix))
}
