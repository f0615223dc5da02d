//! Addressable routes from an entity root to a mutated leaf.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ChangeError, ChangeResult};
use crate::shape::Shape;

/// One step of a [`ChangePath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangePathSegment {
    /// A named member: a scalar, or a nested owned object.
    Property(String),
    /// A position within an ordered collection member.
    Index(usize),
    /// An entry within an associative collection member.
    Key(String),
}

impl ChangePathSegment {
    /// Returns `true` for [`ChangePathSegment::Property`].
    pub fn is_property(&self) -> bool {
        matches!(self, Self::Property(_))
    }
}

impl fmt::Display for ChangePathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(name) => write!(f, "{name}"),
            Self::Index(i) => write!(f, "[{i}]"),
            Self::Key(k) => write!(f, "[{k:?}]"),
        }
    }
}

/// An ordered, non-empty sequence of segments, root to leaf.
///
/// The last segment identifies the mutated leaf. Every earlier segment must
/// name a traversable container on the owning entity; [`Self::resolve`]
/// checks that against the entity's static [`Shape`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChangePathSegment>", into = "Vec<ChangePathSegment>")]
pub struct ChangePath {
    segments: Vec<ChangePathSegment>,
}

impl ChangePath {
    /// Build a path from its segments. Fails if `segments` is empty.
    pub fn new(segments: Vec<ChangePathSegment>) -> ChangeResult<Self> {
        if segments.is_empty() {
            return Err(ChangeError::EmptyPath);
        }
        Ok(Self { segments })
    }

    /// A single-segment path addressing a named member of the root.
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            segments: vec![ChangePathSegment::Property(name.into())],
        }
    }

    /// A single-segment path addressing a collection position.
    pub fn index(position: usize) -> Self {
        Self {
            segments: vec![ChangePathSegment::Index(position)],
        }
    }

    /// A single-segment path addressing a keyed collection entry.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            segments: vec![ChangePathSegment::Key(key.into())],
        }
    }

    /// A copy of this path with `segment` appended.
    pub fn child(&self, segment: ChangePathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// A copy of this path rooted under `prefix`.
    pub fn prefixed(&self, prefix: &[ChangePathSegment]) -> Self {
        let mut segments = Vec::with_capacity(prefix.len() + self.segments.len());
        segments.extend_from_slice(prefix);
        segments.extend_from_slice(&self.segments);
        Self { segments }
    }

    /// The segments, root first.
    pub fn segments(&self) -> &[ChangePathSegment] {
        &self.segments
    }

    /// The mutated leaf.
    pub fn leaf(&self) -> &ChangePathSegment {
        // Non-empty by construction.
        &self.segments[self.segments.len() - 1]
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; present for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check that this path can be traversed against `shape`.
    ///
    /// `Property` descends into an object member, `Index` into a list
    /// element and `Key` into a map value. The leaf may land on any shape;
    /// every other segment must land on a container.
    pub fn resolve(&self, shape: &Shape) -> bool {
        let mut current = shape;
        for (i, segment) in self.segments.iter().enumerate() {
            let next = match (segment, current) {
                (ChangePathSegment::Property(name), Shape::Object(_)) => current.member(name),
                (ChangePathSegment::Index(_), Shape::List(element)) => Some(element.as_ref()),
                (ChangePathSegment::Key(_), Shape::Map(value)) => Some(value.as_ref()),
                _ => None,
            };
            let Some(next) = next else {
                return false;
            };
            let is_leaf = i + 1 == self.segments.len();
            if !is_leaf && !next.is_container() {
                return false;
            }
            current = next;
        }
        true
    }
}

impl fmt::Display for ChangePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && segment.is_property() {
                write!(f, ".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl TryFrom<Vec<ChangePathSegment>> for ChangePath {
    type Error = ChangeError;

    fn try_from(segments: Vec<ChangePathSegment>) -> ChangeResult<Self> {
        Self::new(segments)
    }
}

impl From<ChangePath> for Vec<ChangePathSegment> {
    fn from(path: ChangePath) -> Self {
        path.segments
    }
}

impl From<&str> for ChangePath {
    fn from(name: &str) -> Self {
        Self::property(name)
    }
}
