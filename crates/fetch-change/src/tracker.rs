//! Mutation logs and the tracked-node contract.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value;

use crate::change_set::ChangeSet;
use crate::error::{ChangeError, ChangeResult};
use crate::path::{ChangePath, ChangePathSegment};

/// Process-wide mutation stamp. Nested nodes keep separate logs; the stamp
/// lets extraction merge them back into true mutation order.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_sequence() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone, Debug)]
struct Mutation {
    seq: u64,
    path: ChangePath,
    value: Value,
}

/// The mutation log of one tracked node.
///
/// Paths are relative to the node that owns the tracker. Recording a path
/// that already has a pending entry replaces it (last write wins per leaf).
///
/// A value that fails to serialize does not make the setter fail. The fault
/// is kept and reported by [`collect_changes`], so setters stay infallible and
/// the failure still blocks persistence.
#[derive(Clone, Debug, Default)]
pub struct ChangeTracker {
    log: Vec<Mutation>,
    fault: Option<(ChangePath, String)>,
}

impl ChangeTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the member `property` was set to `value`.
    pub fn set<V: Serialize + ?Sized>(&mut self, property: &str, value: &V) {
        self.record(ChangePath::property(property), value);
    }

    /// Record that the relative `path` was set to `value`.
    pub fn record<V: Serialize + ?Sized>(&mut self, path: ChangePath, value: &V) {
        match serde_json::to_value(value) {
            Ok(value) => self.record_value(path, value),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "tracked value failed to serialize");
                if self.fault.is_none() {
                    self.fault = Some((path, e.to_string()));
                }
            }
        }
    }

    /// Record an already converted value at the relative `path`.
    pub fn record_value(&mut self, path: ChangePath, value: Value) {
        self.log.retain(|m| m.path != path);
        self.log.push(Mutation {
            seq: next_sequence(),
            path,
            value,
        });
    }

    /// Returns `true` if this node has pending mutations.
    pub fn is_dirty(&self) -> bool {
        !self.log.is_empty() || self.fault.is_some()
    }

    /// Number of pending mutations on this node.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Returns `true` if this node has no pending mutations.
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// The pending relative paths in mutation order.
    pub fn paths(&self) -> impl Iterator<Item = &ChangePath> {
        self.log.iter().map(|m| &m.path)
    }

    /// Discard all pending mutations and any recorded fault.
    pub fn clear(&mut self) {
        self.log.clear();
        self.fault = None;
    }
}

/// A node that owns a [`ChangeTracker`]: an entity, a nested owned object, or
/// a tracked collection.
///
/// Nodes with tracked children list them in [`Self::tracked_members`] so that
/// their mutations are reported under the member's name.
pub trait Trackable {
    fn tracker(&self) -> &ChangeTracker;

    fn tracker_mut(&mut self) -> &mut ChangeTracker;

    /// Tracked children, by member name.
    fn tracked_members(&self) -> Vec<(&str, &dyn Trackable)> {
        Vec::new()
    }

    /// Tracked children, mutably. Must list the same members as
    /// [`Self::tracked_members`].
    fn tracked_members_mut(&mut self) -> Vec<&mut dyn Trackable> {
        Vec::new()
    }
}

/// Materialize the pending mutations of `root` and all of its tracked
/// members into a [`ChangeSet`], in mutation order.
///
/// Nested mutations are rooted at `root`: a change to `name` inside the
/// member `child` is reported as `child.name`. The logs are left untouched.
pub fn collect_changes(root: &dyn Trackable) -> ChangeResult<ChangeSet> {
    let mut mutations = Vec::new();
    gather(root, &[], &mut mutations)?;
    mutations.sort_by_key(|(seq, _, _)| *seq);

    let mut set = ChangeSet::new();
    for (_, path, value) in mutations {
        set.insert(path, value);
    }
    Ok(set)
}

fn gather(
    node: &dyn Trackable,
    prefix: &[ChangePathSegment],
    out: &mut Vec<(u64, ChangePath, Value)>,
) -> ChangeResult<()> {
    let tracker = node.tracker();
    if let Some((path, message)) = &tracker.fault {
        return Err(ChangeError::Serialization {
            path: path.prefixed(prefix).to_string(),
            message: message.clone(),
        });
    }

    for mutation in &tracker.log {
        out.push((
            mutation.seq,
            mutation.path.prefixed(prefix),
            mutation.value.clone(),
        ));
    }

    for (name, member) in node.tracked_members() {
        let mut member_prefix = prefix.to_vec();
        member_prefix.push(ChangePathSegment::Property(name.to_string()));
        gather(member, &member_prefix, out)?;
    }
    Ok(())
}

/// Clear the logs of `root` and all of its tracked members.
pub fn accept_changes(root: &mut dyn Trackable) {
    root.tracker_mut().clear();
    for member in root.tracked_members_mut() {
        accept_changes(member);
    }
}
