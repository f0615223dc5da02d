//! Collections that log element-level mutations.
//!
//! Both containers keep their own [`ChangeTracker`] with paths relative to
//! the collection (`[2]`, `["k"]`). The owning entity lists the collection in
//! [`Trackable::tracked_members`], which roots those paths under the member
//! name. Replacing the whole collection is still a plain property set on the
//! owner.

use std::collections::BTreeMap;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::ChangePath;
use crate::tracker::{ChangeTracker, Trackable};

/// An ordered sequence that records index-level mutations.
///
/// Indices are recorded as they were when the mutation happened; a later
/// insert or remove does not rewrite earlier entries. Removals are recorded
/// as `Null` at the removed index.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeTrackingCollection<T> {
    items: Vec<T>,
    #[serde(skip)]
    tracker: ChangeTracker,
}

impl<T> ChangeTrackingCollection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            tracker: ChangeTracker::new(),
        }
    }

    /// The items as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Serialize> ChangeTrackingCollection<T> {
    /// Append an item.
    pub fn push(&mut self, item: T) {
        self.tracker.record(ChangePath::index(self.items.len()), &item);
        self.items.push(item);
    }

    /// Insert an item at `index`, shifting later items.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, as [`Vec::insert`] does.
    pub fn insert(&mut self, index: usize, item: T) {
        self.tracker.record(ChangePath::index(index), &item);
        self.items.insert(index, item);
    }

    /// Replace the item at `index`, returning the previous one.
    ///
    /// Returns `None` and records nothing if `index` is out of bounds.
    pub fn set(&mut self, index: usize, item: T) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        self.tracker.record(ChangePath::index(index), &item);
        Some(std::mem::replace(&mut self.items[index], item))
    }

    /// Remove and return the item at `index`.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        self.tracker
            .record_value(ChangePath::index(index), Value::Null);
        Some(self.items.remove(index))
    }

    /// Remove and return the last item.
    pub fn pop(&mut self) -> Option<T> {
        let last = self.items.len().checked_sub(1)?;
        self.remove(last)
    }

    /// Remove every item, recording one removal per index.
    pub fn clear(&mut self) {
        for index in (0..self.items.len()).rev() {
            self.tracker
                .record_value(ChangePath::index(index), Value::Null);
        }
        self.items.clear();
    }
}

impl<T> Default for ChangeTrackingCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for ChangeTrackingCollection<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            items,
            tracker: ChangeTracker::new(),
        }
    }
}

impl<T> Deref for ChangeTrackingCollection<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T: PartialEq> PartialEq for ChangeTrackingCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T> Trackable for ChangeTrackingCollection<T> {
    fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }
}

/// A string-keyed map that records key-level mutations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeTrackingMap<V> {
    entries: BTreeMap<String, V>,
    #[serde(skip)]
    tracker: ChangeTracker,
}

impl<V> ChangeTrackingMap<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            tracker: ChangeTracker::new(),
        }
    }
}

impl<V: Serialize> ChangeTrackingMap<V> {
    /// Insert or replace the value for `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        self.tracker.record(ChangePath::key(key.clone()), &value);
        self.entries.insert(key, value)
    }

    /// Remove the value for `key`. Records nothing if the key is absent.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let removed = self.entries.remove(key)?;
        self.tracker.record_value(ChangePath::key(key), Value::Null);
        Some(removed)
    }
}

impl<V> Default for ChangeTrackingMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> From<BTreeMap<String, V>> for ChangeTrackingMap<V> {
    fn from(entries: BTreeMap<String, V>) -> Self {
        Self {
            entries,
            tracker: ChangeTracker::new(),
        }
    }
}

impl<V> Deref for ChangeTrackingMap<V> {
    type Target = BTreeMap<String, V>;

    fn deref(&self) -> &BTreeMap<String, V> {
        &self.entries
    }
}

impl<V: PartialEq> PartialEq for ChangeTrackingMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<V> Trackable for ChangeTrackingMap<V> {
    fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }
}
