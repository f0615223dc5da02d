//! Ordered, path-addressed change sets.

use serde::Serialize;
use serde_json::Value;

use crate::path::ChangePath;

/// A single entry of a [`ChangeSet`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Change {
    /// Where the mutation happened, rooted at the entity.
    pub path: ChangePath,
    /// The value written. Removals from tracked collections are `Null`.
    pub value: Value,
}

/// The pending mutations of one entity, keyed by [`ChangePath`].
///
/// Entries are kept in mutation order. Writing a path that is already present
/// supersedes the earlier entry: it is removed and the new value is appended,
/// so each path appears at most once and holds the last value written.
///
/// A change set is a value. Once handed to a processor or adapter it is only
/// ever read; a processor that needs different values replaces the whole set.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` at `path`, superseding any earlier entry for that path.
    pub fn insert(&mut self, path: ChangePath, value: Value) {
        self.changes.retain(|change| change.path != path);
        self.changes.push(Change { path, value });
    }

    /// The value recorded for `path`, if any.
    pub fn get(&self, path: &ChangePath) -> Option<&Value> {
        self.changes
            .iter()
            .find(|change| &change.path == path)
            .map(|change| &change.value)
    }

    /// Returns `true` if `path` has a pending change.
    pub fn contains(&self, path: &ChangePath) -> bool {
        self.get(path).is_some()
    }

    /// Iterate entries in mutation order.
    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// The changed paths in mutation order.
    pub fn paths(&self) -> impl Iterator<Item = &ChangePath> {
        self.changes.iter().map(|change| &change.path)
    }

    /// Number of distinct changed paths.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl FromIterator<(ChangePath, Value)> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = (ChangePath, Value)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (path, value) in iter {
            set.insert(path, value);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ChangePathSegment;
    use serde_json::json;

    #[test]
    fn empty_set() {
        let set = ChangeSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert!(set.get(&ChangePath::property("a")).is_none());
    }

    #[test]
    fn preserves_mutation_order() {
        let mut set = ChangeSet::new();
        set.insert(ChangePath::property("b"), json!(1));
        set.insert(ChangePath::property("a"), json!(2));
        let paths: Vec<String> = set.paths().map(ToString::to_string).collect();
        assert_eq!(paths, vec!["b", "a"]);
    }

    #[test]
    fn rewrite_supersedes_earlier_entry() {
        let mut set = ChangeSet::new();
        set.insert(ChangePath::property("a"), json!(1));
        set.insert(ChangePath::property("b"), json!(2));
        set.insert(ChangePath::property("a"), json!(3));

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(&ChangePath::property("a")), Some(&json!(3)));
        let paths: Vec<String> = set.paths().map(ToString::to_string).collect();
        assert_eq!(paths, vec!["b", "a"]);
    }

    #[test]
    fn nested_and_parent_paths_are_distinct() {
        let parent = ChangePath::property("child");
        let nested = parent.child(ChangePathSegment::Property("name".into()));
        let set: ChangeSet = vec![
            (nested.clone(), json!("x")),
            (parent.clone(), json!({"name": "y"})),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&nested));
        assert!(set.contains(&parent));
    }

    #[test]
    fn serializes_as_entry_list() {
        let mut set = ChangeSet::new();
        set.insert(ChangePath::property("a"), json!(1));
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value, json!([{"path": [{"Property": "a"}], "value": 1}]));
    }
}
