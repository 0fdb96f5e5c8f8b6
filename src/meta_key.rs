//! Template keys: the label set a meta group is identified by

use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

/// Canonical identity of a template, the sorted list of its labels
///
/// `(M3TA a b)` and `(M3TA b a)` produce the same key. Duplicate labels are
/// kept, so `(M3TA a a)` is a different key from `(M3TA a)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetaKey {
    labels: Vec<String>,
}

impl MetaKey {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        labels.sort();
        Self { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl fmt::Display for MetaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.labels.join(" "))
    }
}

/// Set of template keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaKeySet {
    keys: BTreeSet<MetaKey>,
}

impl MetaKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: MetaKey) {
        self.keys.insert(key);
    }

    pub fn contains(&self, key: &MetaKey) -> bool {
        self.keys.contains(key)
    }

    /// Add every key of `other` to this set
    pub fn update(&mut self, other: &MetaKeySet) {
        self.keys.extend(other.keys.iter().cloned());
    }

    /// Keys in this set that are not in `other`
    pub fn difference(&self, other: &MetaKeySet) -> MetaKeySet {
        self.keys
            .iter()
            .filter(|key| !other.contains(key))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in sorted order
    pub fn iter(&self) -> btree_set::Iter<'_, MetaKey> {
        self.keys.iter()
    }

    pub fn to_vec(&self) -> Vec<MetaKey> {
        self.keys.iter().cloned().collect()
    }
}

impl FromIterator<MetaKey> for MetaKeySet {
    fn from_iter<T: IntoIterator<Item = MetaKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MetaKeySet {
    type Item = MetaKey;
    type IntoIter = btree_set::IntoIter<MetaKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

impl<'a> IntoIterator for &'a MetaKeySet {
    type Item = &'a MetaKey;
    type IntoIter = btree_set::Iter<'a, MetaKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}
