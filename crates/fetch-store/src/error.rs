use fetch_change::{ChangeError, ChangePath, Keys};

/// Errors from storage adapter and query operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row exists for the given keys.
    #[error("no {entity} row with keys {keys}")]
    NotFound { entity: &'static str, keys: Keys },

    /// A row with the same keys already exists.
    #[error("duplicate {entity} row with keys {keys}")]
    DuplicateKey { entity: &'static str, keys: Keys },

    /// A strict first/single lookup matched nothing.
    #[error("query returned no results")]
    NoMatch,

    /// A single-result lookup matched more than one row.
    #[error("query returned {count} results where at most one was expected")]
    MultipleMatches { count: usize },

    /// The caller's cancellation token fired.
    #[error("storage operation cancelled")]
    Cancelled,

    /// A change path addresses a collection element and the adapter is
    /// configured to reject such paths.
    #[error("unsupported change path {0}")]
    UnsupportedPath(ChangePath),

    /// A change path does not fit the stored document.
    #[error("change path {path} does not match the stored shape: {reason}")]
    ShapeMismatch { path: ChangePath, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Change extraction or key handling failed.
    #[error(transparent)]
    Change(#[from] ChangeError),

    /// A lock guarding in-memory state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
