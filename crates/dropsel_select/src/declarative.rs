//! Declarative option children
//!
//! The second ingestion path: option and group children register themselves
//! with a [`DeclarativeTree`] as they are mounted and unregister when they go
//! away. Groups claim the options they contain; unclaimed options are
//! top-level. Every structural change bumps [`DeclarativeTree::version`] so
//! the owning dropdown knows to re-normalize.

use serde_json::Value;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    /// Handle to a registered child
    pub struct ChildKey;
}

/// An option child as registered by the host
#[derive(Clone, Debug, PartialEq)]
pub struct OptionRegistration {
    pub id: Option<String>,
    pub value: Value,
    pub label: Option<String>,
    pub disabled: bool,
}

impl OptionRegistration {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            id: None,
            value: value.into(),
            label: Some(label.into()),
            disabled: false,
        }
    }

    /// Register with an explicit, stable id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// A group child as registered by the host
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupRegistration {
    pub id: Option<String>,
    pub label: Option<String>,
    pub disabled: bool,
}

impl GroupRegistration {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: None,
            label: Some(label.into()),
            disabled: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Child {
    Option(OptionRegistration),
    Group {
        group: GroupRegistration,
        claims: SmallVec<[ChildKey; 8]>,
    },
}

/// Registry of declaratively mounted option and group children
#[derive(Clone, Debug, Default)]
pub struct DeclarativeTree {
    children: SlotMap<ChildKey, Child>,
    /// Registration order of live children
    order: Vec<ChildKey>,
    version: u64,
}

impl DeclarativeTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, child: Child) -> ChildKey {
        let key = self.children.insert(child);
        self.order.push(key);
        self.version += 1;
        key
    }

    /// Register an option child
    pub fn register_option(&mut self, option: OptionRegistration) -> ChildKey {
        self.insert(Child::Option(option))
    }

    /// Register a group child claiming already-registered options
    ///
    /// Keys that are not live options are ignored.
    pub fn register_group(
        &mut self,
        group: GroupRegistration,
        claims: impl IntoIterator<Item = ChildKey>,
    ) -> ChildKey {
        let mut live: SmallVec<[ChildKey; 8]> = SmallVec::new();
        for key in claims {
            if self.option(key).is_some() && !live.contains(&key) {
                live.push(key);
            }
        }
        self.insert(Child::Group {
            group,
            claims: live,
        })
    }

    /// Add `option` to the claims of `group`. Returns false for stale keys.
    pub fn claim(&mut self, group: ChildKey, option: ChildKey) -> bool {
        if !matches!(self.children.get(option), Some(Child::Option(_))) {
            return false;
        }
        match self.children.get_mut(group) {
            Some(Child::Group { claims, .. }) => {
                if !claims.contains(&option) {
                    claims.push(option);
                    self.version += 1;
                }
                true
            }
            _ => false,
        }
    }

    /// Remove a child
    ///
    /// Removing a group also removes the options it owns, that is the options
    /// it was the first live group to claim. Options owned by another group
    /// stay.
    pub fn unregister(&mut self, key: ChildKey) -> bool {
        let owned: SmallVec<[ChildKey; 8]> = match self.children.get(key) {
            None => return false,
            Some(Child::Option(_)) => SmallVec::new(),
            Some(Child::Group { claims, .. }) => claims
                .iter()
                .copied()
                .filter(|claimed| self.owner_of(*claimed) == Some(key))
                .collect(),
        };
        self.children.remove(key);
        for claimed in owned {
            self.children.remove(claimed);
        }
        let children = &self.children;
        self.order.retain(|k| children.contains_key(*k));
        self.version += 1;
        true
    }

    /// Structural version, bumped on every add, remove or claim
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of live children (groups and options)
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Live children in registration order
    pub(crate) fn children(&self) -> impl Iterator<Item = (ChildKey, &Child)> {
        self.order
            .iter()
            .filter_map(|key| self.children.get(*key).map(|child| (*key, child)))
    }

    /// The group an option belongs to: the first live group claiming it
    pub fn owner_of(&self, option: ChildKey) -> Option<ChildKey> {
        self.option(option)?;
        self.children().find_map(|(key, child)| match child {
            Child::Group { claims, .. } if claims.contains(&option) => Some(key),
            _ => None,
        })
    }

    pub(crate) fn option(&self, key: ChildKey) -> Option<&OptionRegistration> {
        match self.children.get(key) {
            Some(Child::Option(option)) => Some(option),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_tracks_structure() {
        let mut tree = DeclarativeTree::new();
        assert_eq!(tree.version(), 0);

        let a = tree.register_option(OptionRegistration::new(1, "A"));
        let g = tree.register_group(GroupRegistration::new("G"), []);
        assert_eq!(tree.version(), 2);

        assert!(tree.claim(g, a));
        assert_eq!(tree.version(), 3);

        // Claiming twice is not a structural change
        assert!(tree.claim(g, a));
        assert_eq!(tree.version(), 3);
    }

    #[test]
    fn test_claim_rejects_stale_keys() {
        let mut tree = DeclarativeTree::new();
        let a = tree.register_option(OptionRegistration::new(1, "A"));
        let g = tree.register_group(GroupRegistration::new("G"), []);
        assert!(!tree.claim(a, g));
        tree.unregister(a);
        assert!(!tree.claim(g, a));
    }

    #[test]
    fn test_unregister_group_removes_children() {
        let mut tree = DeclarativeTree::new();
        let a = tree.register_option(OptionRegistration::new(1, "A"));
        let b = tree.register_option(OptionRegistration::new(2, "B"));
        let g = tree.register_group(GroupRegistration::new("G"), [a]);
        assert_eq!(tree.len(), 3);

        assert!(tree.unregister(g));
        assert_eq!(tree.len(), 1);
        assert!(tree.option(a).is_none());
        assert!(tree.option(b).is_some());
        assert!(!tree.unregister(g));
    }

    #[test]
    fn test_unregister_keeps_options_owned_elsewhere() {
        let mut tree = DeclarativeTree::new();
        let a = tree.register_option(OptionRegistration::new(1, "A"));
        let b = tree.register_option(OptionRegistration::new(2, "B"));
        let g1 = tree.register_group(GroupRegistration::new("G1"), [a]);
        let g2 = tree.register_group(GroupRegistration::new("G2"), [a, b]);
        assert_eq!(tree.owner_of(a), Some(g1));
        assert_eq!(tree.owner_of(b), Some(g2));

        assert!(tree.unregister(g2));
        assert!(tree.option(a).is_some());
        assert!(tree.option(b).is_none());
        assert_eq!(tree.owner_of(a), Some(g1));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_unregister_owner_removes_shared_option() {
        let mut tree = DeclarativeTree::new();
        let a = tree.register_option(OptionRegistration::new(1, "A"));
        let g1 = tree.register_group(GroupRegistration::new("G1"), [a]);
        let g2 = tree.register_group(GroupRegistration::new("G2"), [a]);

        assert!(tree.unregister(g1));
        assert!(tree.option(a).is_none());
        assert_eq!(tree.owner_of(a), None);
        assert_eq!(tree.children().map(|(k, _)| k).collect::<Vec<_>>(), vec![g2]);
    }

    #[test]
    fn test_register_group_ignores_non_option_claims() {
        let mut tree = DeclarativeTree::new();
        let a = tree.register_option(OptionRegistration::new(1, "A"));
        let g1 = tree.register_group(GroupRegistration::new("G1"), [a]);
        let stale = tree.register_option(OptionRegistration::new(2, "B"));
        tree.unregister(stale);

        let g2 = tree.register_group(GroupRegistration::new("G2"), [g1, stale, a, a]);
        assert!(tree.unregister(g2));
        // g1 is a group, not an option: it survives, and so does its option
        assert_eq!(tree.len(), 2);
        assert!(tree.option(a).is_some());
        assert!(tree.unregister(g1));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_children_in_registration_order() {
        let mut tree = DeclarativeTree::new();
        let a = tree.register_option(OptionRegistration::new(1, "A"));
        let b = tree.register_option(OptionRegistration::new(2, "B"));
        let c = tree.register_option(OptionRegistration::new(3, "C"));
        tree.unregister(b);
        let keys: Vec<_> = tree.children().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![a, c]);
    }
}
