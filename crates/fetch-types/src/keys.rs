use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A single scalar component of an entity key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPart {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl KeyPart {
    /// The integer value, if this part is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// The identity of an entity: an ordered tuple of key parts.
///
/// Order is significant. `(1, "a")` and `("a", 1)` identify different rows.
/// The same logical row must always produce the same `Keys`, which is what
/// lets adapters use it as a row index. A tuple always has at least one
/// part, so every `Keys` survives [`Keys::encode`] and [`Keys::decode`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<KeyPart>", into = "Vec<KeyPart>")]
pub struct Keys(Vec<KeyPart>);

impl Keys {
    /// Build a key tuple from its parts. Fails with [`TypeError::EmptyKeys`]
    /// when `parts` is empty.
    pub fn new(parts: Vec<KeyPart>) -> Result<Self, TypeError> {
        if parts.is_empty() {
            return Err(TypeError::EmptyKeys);
        }
        Ok(Self(parts))
    }

    /// A single-part key.
    pub fn single(part: impl Into<KeyPart>) -> Self {
        Self(vec![part.into()])
    }

    /// The key parts in order.
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Number of key parts.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; a tuple has at least one part.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first part, for the common single-key case.
    pub fn first(&self) -> Option<&KeyPart> {
        self.0.first()
    }

    /// Encode into an opaque, URL-safe string.
    ///
    /// The encoding is the hex form of the JSON array of parts, so it never
    /// contains separators that would need escaping in a cursor.
    pub fn encode(&self) -> String {
        // A Vec of untagged scalars always serializes.
        let json = serde_json::to_vec(&self.0).unwrap_or_default();
        hex::encode(json)
    }

    /// Decode a string produced by [`Self::encode`].
    pub fn decode(encoded: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(encoded).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let parts: Vec<KeyPart> =
            serde_json::from_slice(&bytes).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Self::new(parts)
    }
}

impl fmt::Display for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{part}")?;
        }
        write!(f, ")")
    }
}

impl From<i64> for Keys {
    fn from(value: i64) -> Self {
        Self::single(value)
    }
}

impl From<&str> for Keys {
    fn from(value: &str) -> Self {
        Self::single(value)
    }
}

impl From<String> for Keys {
    fn from(value: String) -> Self {
        Self::single(value)
    }
}

impl TryFrom<Vec<KeyPart>> for Keys {
    type Error = TypeError;

    fn try_from(parts: Vec<KeyPart>) -> Result<Self, Self::Error> {
        Self::new(parts)
    }
}

impl From<Keys> for Vec<KeyPart> {
    fn from(keys: Keys) -> Self {
        keys.0
    }
}
