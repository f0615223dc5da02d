//! Stage-keyed processor registration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::stage::{Processor, Stage};

/// Supplies the ordered processor list for each stage.
///
/// An empty list is valid and makes the stage a no-op. Pipelines resolve
/// every stage once, when they are built, so providers are not consulted on
/// the mutation path.
pub trait ProcessorProvider<T>: Send + Sync {
    fn processors(&self, stage: Stage) -> Vec<Arc<dyn Processor<T>>>;
}

/// Explicit registry mapping each [`Stage`] to an ordered processor list.
pub struct ProcessorRegistry<T> {
    stages: HashMap<Stage, Vec<Arc<dyn Processor<T>>>>,
}

impl<T> ProcessorRegistry<T> {
    /// Create a registry with no processors.
    pub fn new() -> Self {
        Self {
            stages: HashMap::new(),
        }
    }

    /// Append a processor to the end of `stage`'s list.
    pub fn register<P>(&mut self, stage: Stage, processor: P) -> &mut Self
    where
        P: Processor<T> + 'static,
    {
        self.register_shared(stage, Arc::new(processor))
    }

    /// Append an already shared processor to the end of `stage`'s list.
    ///
    /// The same processor may be registered on several stages.
    pub fn register_shared(&mut self, stage: Stage, processor: Arc<dyn Processor<T>>) -> &mut Self {
        self.stages.entry(stage).or_default().push(processor);
        self
    }

    /// Builder form of [`Self::register`].
    pub fn with<P>(mut self, stage: Stage, processor: P) -> Self
    where
        P: Processor<T> + 'static,
    {
        self.register(stage, processor);
        self
    }

    /// Number of processors registered for `stage`.
    pub fn len(&self, stage: Stage) -> usize {
        self.stages.get(&stage).map_or(0, Vec::len)
    }

    /// Returns `true` if no stage has a processor.
    pub fn is_empty(&self) -> bool {
        self.stages.values().all(Vec::is_empty)
    }
}

impl<T> Default for ProcessorRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ProcessorProvider<T> for ProcessorRegistry<T> {
    fn processors(&self, stage: Stage) -> Vec<Arc<dyn Processor<T>>> {
        self.stages.get(&stage).cloned().unwrap_or_default()
    }
}

impl<T> fmt::Debug for ProcessorRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for stage in Stage::ALL {
            let names: Vec<&str> = self
                .stages
                .get(&stage)
                .map(|list| list.iter().map(|p| p.name()).collect())
                .unwrap_or_default();
            map.entry(&stage, &names);
        }
        map.finish()
    }
}
