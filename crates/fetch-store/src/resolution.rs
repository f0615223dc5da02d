//! Mapping change paths onto stored documents for partial updates.
//!
//! A path is a run of `Property` segments through owned members, ending in
//! the property to write. Everything before the terminal property is the
//! *resolvable unit*. Paths that step into a collection element cannot be
//! written as a single property and resolve to
//! [`PathResolution::Unsupported`].

use fetch_change::{ChangePath, ChangePathSegment};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Where a change path lands in a stored document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathResolution<'a> {
    /// Write `property` inside the owned member chain `unit` (empty for the
    /// entity root).
    Property {
        unit: Vec<&'a str>,
        property: &'a str,
    },
    /// The path reaches `segment`, an element of the collection member
    /// `owner`.
    Unsupported {
        owner: Vec<&'a str>,
        segment: &'a ChangePathSegment,
    },
}

/// Resolve `path` from the entity root.
pub fn resolve_path(path: &ChangePath) -> PathResolution<'_> {
    let segments = path.segments();
    let mut unit = Vec::with_capacity(segments.len());
    for (position, segment) in segments.iter().enumerate() {
        match segment {
            ChangePathSegment::Property(name) if position + 1 == segments.len() => {
                return PathResolution::Property {
                    unit,
                    property: name.as_str(),
                };
            }
            ChangePathSegment::Property(name) => unit.push(name.as_str()),
            ChangePathSegment::Index(_) | ChangePathSegment::Key(_) => {
                return PathResolution::Unsupported {
                    owner: unit,
                    segment,
                };
            }
        }
    }
    // ChangePath is never empty, so the loop always returns.
    PathResolution::Unsupported {
        owner: unit,
        segment: path.leaf(),
    }
}

/// What an adapter did with each path of a change set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Paths written as single properties.
    pub applied: Vec<ChangePath>,
    /// Collection paths left unpersisted.
    pub skipped: Vec<ChangePath>,
    /// Members rewritten whole in place of collection paths.
    pub coarsened: Vec<ChangePath>,
}

impl ApplyReport {
    /// Returns `true` if nothing was written.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.coarsened.is_empty()
    }
}

/// Read the value at `unit` in `document`, if every step exists.
pub fn read_at<'v>(document: &'v Value, unit: &[&str]) -> Option<&'v Value> {
    unit.iter()
        .try_fold(document, |node, name| node.as_object()?.get(*name))
}

/// Write `value` to `property` inside the owned member chain `unit`.
///
/// Every step of `unit` must already exist as an object. A missing or null
/// owned member is a [`StoreError::ShapeMismatch`]: a partial update cannot
/// invent the rest of its fields.
pub fn write_property(
    document: &mut Value,
    path: &ChangePath,
    unit: &[&str],
    property: &str,
    value: Value,
) -> StoreResult<()> {
    let mut node = document;
    for name in unit {
        node = object_mut(node, path)?
            .get_mut(*name)
            .filter(|child| child.is_object())
            .ok_or_else(|| StoreError::ShapeMismatch {
                path: path.clone(),
                reason: format!("owned member '{name}' is missing or null"),
            })?;
    }
    object_mut(node, path)?.insert(property.to_string(), value);
    Ok(())
}

fn object_mut<'v>(node: &'v mut Value, path: &ChangePath) -> StoreResult<&'v mut Map<String, Value>> {
    node.as_object_mut().ok_or_else(|| StoreError::ShapeMismatch {
        path: path.clone(),
        reason: "expected an object".into(),
    })
}
