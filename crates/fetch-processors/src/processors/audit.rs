//! Records every stage an entity passes through.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use async_trait::async_trait;
use fetch_change::ChangePath;
use serde::Serialize;
use tracing::debug;

use crate::error::{ProcessorError, ProcessorResult};
use crate::stage::{EntityPackage, Processor, ProcessorDecision, Stage};

/// One observed lifecycle event.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEntry {
    pub stage: Stage,
    /// `Debug` rendering of the entity at the time of the event.
    pub entity: String,
    /// Changed paths, for update stages.
    pub changed: Vec<ChangePath>,
    pub at: SystemTime,
}

/// Shared, append-only list of [`AuditEntry`] values.
#[derive(Clone, Debug, Default)]
pub struct AuditTrail {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries in recording order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stages recorded so far, in order.
    pub fn stages(&self) -> Vec<Stage> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| entry.stage)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, entry: AuditEntry) -> ProcessorResult<()> {
        self.entries
            .lock()
            .map_err(|_| ProcessorError::failed("audit", "audit trail lock poisoned"))?
            .push(entry);
        Ok(())
    }
}

/// Appends an [`AuditEntry`] to its trail and always continues.
#[derive(Clone, Debug)]
pub struct AuditProcessor {
    trail: AuditTrail,
}

impl AuditProcessor {
    pub fn new(trail: AuditTrail) -> Self {
        Self { trail }
    }

    pub fn trail(&self) -> &AuditTrail {
        &self.trail
    }
}

#[async_trait]
impl<T> Processor<T> for AuditProcessor
where
    T: Debug + Sync,
{
    fn name(&self) -> &str {
        "audit"
    }

    async fn process(&self, package: &EntityPackage<'_, T>) -> ProcessorResult<ProcessorDecision> {
        let changed = package
            .changes()
            .map(|changes| changes.paths().cloned().collect())
            .unwrap_or_default();
        let entry = AuditEntry {
            stage: package.stage(),
            entity: format!("{:?}", package.entity()),
            changed,
            at: SystemTime::now(),
        };
        debug!(stage = %entry.stage, entity = %entry.entity, "audit");
        self.trail.push(entry)?;
        Ok(ProcessorDecision::Continue)
    }
}
