//! Instance identities and generated item ids.
//!
//! Every dropdown instance needs an identity that the exclusivity registry can
//! compare against, and options or groups that arrive without an `id` need a
//! fresh token at normalization time.
//!
//! # Example
//!
//! ```
//! use dropsel_core::key::{generate_token, InstanceKey};
//!
//! // Generated, unique per instance
//! let country = InstanceKey::new("select");
//! let language = InstanceKey::new("select");
//! assert_ne!(country, language);
//!
//! // Explicit key for hosts that address instances by name
//! let fixed = InstanceKey::explicit("settings-theme");
//! assert_eq!(fixed.get(), "settings-theme");
//!
//! // Missing option ids get a fresh token every time
//! assert_ne!(generate_token("opt"), generate_token("opt"));
//! ```

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of one widget instance
///
/// Clones share the same identity. Two keys are equal when their strings are.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct InstanceKey(Arc<str>);

impl InstanceKey {
    /// Fresh `{prefix}-{uuid}` key, distinct from every other instance
    pub fn new(prefix: &str) -> Self {
        Self(generate_token(prefix).into())
    }

    /// Use `key` verbatim. The host is responsible for uniqueness.
    pub fn explicit(key: impl Into<String>) -> Self {
        Self(key.into().into())
    }

    pub fn get(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceKey({})", self.0)
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a fresh token for an item that arrived without an id.
///
/// Tokens are `{prefix}-{uuid}` and are never reused, so two normalization
/// passes over the same id-less data yield different ids.
pub fn generate_token(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().as_simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_keys_are_unique() {
        let keys: HashSet<InstanceKey> = (0..5).map(|_| InstanceKey::new("select")).collect();
        assert_eq!(keys.len(), 5);
        assert!(keys.iter().all(|key| key.get().starts_with("select-")));
    }

    #[test]
    fn test_explicit_key() {
        let key = InstanceKey::explicit("my-select");
        assert_eq!(key.get(), "my-select");
        assert_eq!(key.to_string(), "my-select");
        assert_eq!(key, InstanceKey::explicit("my-select"));
    }

    #[test]
    fn test_clone_is_same_instance() {
        let key = InstanceKey::new("select");
        assert_eq!(key.clone(), key);
        assert_eq!(key.clone().get(), key.get());
    }

    #[test]
    fn test_generated_tokens_are_fresh() {
        let a = generate_token("opt");
        let b = generate_token("opt");
        assert!(a.starts_with("opt-"));
        assert_ne!(a, b);
    }
}
