//! Concurrent group membership set.

use std::{
    collections::BTreeSet,
    sync::{PoisonError, RwLock},
};

/// Set of group names a connection belongs to.
///
/// Safe to share between the receive path and concurrent senders. Readers
/// only ever see a copied [`snapshot`](Self::snapshot), never the live set.
#[derive(Debug, Default)]
pub struct GroupSet {
    inner: RwLock<BTreeSet<String>>,
}

impl GroupSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group. Returns `false` if it was already present.
    pub fn add(&self, name: impl Into<String>) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into())
    }

    /// Remove a group. Returns `false` if it was not present.
    pub fn remove(&self, name: &str) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Point-in-time copy of the membership, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Whether `name` is currently a member.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Current number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Into<String>> FromIterator<S> for GroupSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            inner: RwLock::new(iter.into_iter().map(Into::into).collect()),
        }
    }
}
