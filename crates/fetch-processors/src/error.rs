use std::time::Duration;

use crate::stage::Stage;

/// Errors that can occur while running a processor pipeline.
///
/// [`crate::PipelineOutcome::Cancelled`] is not an error: a veto is a normal
/// outcome of a pre-stage. Everything here aborts the operation.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// A processor failed in a way it could not recover from.
    #[error("processor '{processor}' failed: {message}")]
    Failed { processor: String, message: String },

    /// A processor returned a decision its stage does not allow.
    #[error("processor '{processor}' returned {decision} during {stage}, which is not allowed")]
    InvalidDecision {
        stage: Stage,
        processor: String,
        decision: &'static str,
    },

    /// An update-stage package was built without a change set.
    #[error("{0} package requires a change set")]
    MissingChangeSet(Stage),

    /// A processor exceeded the configured time limit.
    #[error("processor '{processor}' timed out after {limit:?}")]
    Timeout { processor: String, limit: Duration },

    /// The caller's cancellation signal fired while the stage was running.
    #[error("{stage} stage interrupted by cancellation")]
    Interrupted { stage: Stage },
}

impl ProcessorError {
    /// Create a failure attributed to the named processor.
    pub fn failed(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            processor: processor.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for pipeline results.
pub type ProcessorResult<T> = Result<T, ProcessorError>;
