use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use fetch_change::ChangeSet;
use serde::{Deserialize, Serialize};

use crate::error::{ProcessorError, ProcessorResult};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// A point in an entity mutation's lifecycle where processors run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Adding,
    Added,
    Updating,
    Updated,
    Deleting,
    Deleted,
}

impl Stage {
    /// Every stage, in lifecycle order.
    pub const ALL: [Stage; 6] = [
        Stage::Adding,
        Stage::Added,
        Stage::Updating,
        Stage::Updated,
        Stage::Deleting,
        Stage::Deleted,
    ];

    /// Returns `true` for stages that run before the storage mutation and
    /// may therefore cancel it.
    pub fn is_pre(&self) -> bool {
        matches!(self, Self::Adding | Self::Updating | Self::Deleting)
    }

    /// Returns `true` for stages whose package carries a change set.
    pub fn carries_changes(&self) -> bool {
        matches!(self, Self::Updating | Self::Updated)
    }

    /// Lowercase stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adding => "adding",
            Self::Added => "added",
            Self::Updating => "updating",
            Self::Updated => "updated",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityPackage
// ---------------------------------------------------------------------------

/// The data handed to a processor, specific to its stage.
///
/// Update stages carry the change set being persisted; the others carry only
/// the entity. Packages are read-only views.
#[derive(Debug)]
pub enum EntityPackage<'a, T> {
    Adding { entity: &'a T },
    Added { entity: &'a T },
    Updating { entity: &'a T, changes: &'a ChangeSet },
    Updated { entity: &'a T, changes: &'a ChangeSet },
    Deleting { entity: &'a T },
    Deleted { entity: &'a T },
}

impl<'a, T> EntityPackage<'a, T> {
    /// Build the package for `stage`. Update stages require `changes`.
    pub fn new(
        stage: Stage,
        entity: &'a T,
        changes: Option<&'a ChangeSet>,
    ) -> ProcessorResult<Self> {
        let package = match (stage, changes) {
            (Stage::Adding, _) => Self::Adding { entity },
            (Stage::Added, _) => Self::Added { entity },
            (Stage::Deleting, _) => Self::Deleting { entity },
            (Stage::Deleted, _) => Self::Deleted { entity },
            (Stage::Updating, Some(changes)) => Self::Updating { entity, changes },
            (Stage::Updated, Some(changes)) => Self::Updated { entity, changes },
            (stage, None) => return Err(ProcessorError::MissingChangeSet(stage)),
        };
        Ok(package)
    }

    /// The stage this package was built for.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Adding { .. } => Stage::Adding,
            Self::Added { .. } => Stage::Added,
            Self::Updating { .. } => Stage::Updating,
            Self::Updated { .. } => Stage::Updated,
            Self::Deleting { .. } => Stage::Deleting,
            Self::Deleted { .. } => Stage::Deleted,
        }
    }

    /// The entity being mutated.
    pub fn entity(&self) -> &'a T {
        match *self {
            Self::Adding { entity }
            | Self::Added { entity }
            | Self::Updating { entity, .. }
            | Self::Updated { entity, .. }
            | Self::Deleting { entity }
            | Self::Deleted { entity } => entity,
        }
    }

    /// The change set, for update stages.
    pub fn changes(&self) -> Option<&'a ChangeSet> {
        match *self {
            Self::Updating { changes, .. } | Self::Updated { changes, .. } => Some(changes),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ProcessorDecision
// ---------------------------------------------------------------------------

/// What a processor wants the pipeline to do next.
#[derive(Clone, Debug, PartialEq)]
pub enum ProcessorDecision {
    /// Proceed to the next processor.
    Continue,
    /// Veto the operation. Honoured only by pre-stages.
    Cancel { reason: String },
    /// Persist this change set instead of the one in the package. Only
    /// allowed during [`Stage::Updating`]; later processors see the
    /// replacement.
    ReplaceChanges(ChangeSet),
}

impl ProcessorDecision {
    /// Shorthand for a cancellation.
    pub fn cancel(reason: impl Into<String>) -> Self {
        Self::Cancel {
            reason: reason.into(),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Cancel { .. } => "cancel",
            Self::ReplaceChanges(_) => "replace-changes",
        }
    }
}

// ---------------------------------------------------------------------------
// ProcessorRecord
// ---------------------------------------------------------------------------

/// Recorded result of one processor invocation.
#[derive(Clone, Debug)]
pub struct ProcessorRecord {
    /// Name of the processor.
    pub processor: String,
    /// The decision kind: `continue`, `cancel`, or `replace-changes`.
    pub decision: &'static str,
    /// Reason given with a cancellation.
    pub reason: Option<String>,
    /// Wall-clock time the processor took.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Processor trait
// ---------------------------------------------------------------------------

/// A pluggable observer or gatekeeper invoked at a lifecycle stage.
///
/// The trait is object-safe and `Send + Sync` so processors can be stored as
/// `Arc<dyn Processor<T>>` and shared across repositories.
#[async_trait]
pub trait Processor<T>: Send + Sync {
    /// Human-readable name, used in logs and cancellation outcomes.
    fn name(&self) -> &str;

    /// Inspect the package and decide how the pipeline proceeds.
    async fn process(&self, package: &EntityPackage<'_, T>) -> ProcessorResult<ProcessorDecision>;
}
