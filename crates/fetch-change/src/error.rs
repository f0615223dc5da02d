//! Error types for the change-tracking crate.

use fetch_types::TypeError;

/// Errors that can occur while recording or extracting changes.
#[derive(Debug, thiserror::Error)]
pub enum ChangeError {
    /// A change path must address at least one segment.
    #[error("change path must not be empty")]
    EmptyPath,

    /// The entity is not in a state that allows the operation, e.g. key
    /// extraction before the key fields are set.
    #[error("invalid entity state: {0}")]
    InvalidState(String),

    /// A recorded value could not be converted to its stored form.
    #[error("serialization error at {path}: {message}")]
    Serialization { path: String, message: String },

    /// Key encoding or decoding failed.
    #[error("key error: {0}")]
    Key(#[from] TypeError),
}

impl ChangeError {
    /// Shorthand for an [`ChangeError::InvalidState`] error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

/// Convenience alias for change-tracking results.
pub type ChangeResult<T> = Result<T, ChangeError>;
