//! Static shape descriptors.

/// The static shape of an entity type, used to check that a [`ChangePath`]
/// can be traversed before it is handed to an adapter.
///
/// [`ChangePath`]: crate::ChangePath
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    /// A leaf value with no addressable members.
    Scalar,
    /// An object with named members: the entity root or a nested owned object.
    Object(Vec<(String, Shape)>),
    /// An ordered collection whose elements share a shape.
    List(Box<Shape>),
    /// A keyed collection whose values share a shape.
    Map(Box<Shape>),
}

impl Shape {
    /// Build an object shape from `(name, shape)` pairs.
    pub fn object<N, I>(members: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Shape)>,
    {
        Self::Object(
            members
                .into_iter()
                .map(|(name, shape)| (name.into(), shape))
                .collect(),
        )
    }

    /// Build a list shape.
    pub fn list(element: Shape) -> Self {
        Self::List(Box::new(element))
    }

    /// Build a map shape.
    pub fn map(value: Shape) -> Self {
        Self::Map(Box::new(value))
    }

    /// Look up a named member of an object shape.
    pub fn member(&self, name: &str) -> Option<&Shape> {
        match self {
            Self::Object(members) => members
                .iter()
                .find(|(member, _)| member == name)
                .map(|(_, shape)| shape),
            _ => None,
        }
    }

    /// Returns `true` for shapes that can be traversed further.
    pub fn is_container(&self) -> bool {
        !matches!(self, Self::Scalar)
    }
}
