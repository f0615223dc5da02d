use fetch_change::ChangeError;
use fetch_processors::{ProcessorError, Stage};
use fetch_store::StoreError;

/// Errors surfaced by repositories.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Invalid caller input.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// A strict lookup matched nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A single-result lookup matched more than one row.
    #[error("expected at most one result, found {count}")]
    MultipleResults { count: usize },

    /// A pre-stage processor vetoed the operation. Storage was not touched.
    #[error("{stage} cancelled by processor '{processor}': {reason}")]
    OperationCancelled {
        stage: Stage,
        processor: String,
        reason: String,
    },

    /// The storage adapter failed.
    #[error("persistence failed: {0}")]
    Persistence(StoreError),

    /// The entity is not in a state that allows the operation.
    #[error("invalid entity state: {0}")]
    InvalidState(String),

    /// A processor failed.
    #[error(transparent)]
    Processor(ProcessorError),

    /// The caller's cancellation token fired.
    #[error("operation cancelled by caller")]
    Cancelled,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RepositoryError {
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }
}

impl From<ChangeError> for RepositoryError {
    fn from(err: ChangeError) -> Self {
        match err {
            ChangeError::InvalidState(message) => Self::InvalidState(message),
            ChangeError::Key(err) => Self::Argument(err.to_string()),
            ChangeError::EmptyPath => Self::Argument(err.to_string()),
            other @ ChangeError::Serialization { .. } => Self::InvalidState(other.to_string()),
        }
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoMatch => Self::NotFound("query returned no results".into()),
            StoreError::MultipleMatches { count } => Self::MultipleResults { count },
            StoreError::Cancelled => Self::Cancelled,
            StoreError::Change(err) => err.into(),
            other => Self::Persistence(other),
        }
    }
}

impl From<ProcessorError> for RepositoryError {
    fn from(err: ProcessorError) -> Self {
        match err {
            ProcessorError::Interrupted { .. } => Self::Cancelled,
            other => Self::Processor(other),
        }
    }
}

/// Result alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;
