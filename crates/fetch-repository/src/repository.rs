use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use fetch_change::{ChangeSet, Entity, Keys};
use fetch_processors::{
    PipelineConfig, PipelineOutcome, PipelineReport, ProcessorPipeline, ProcessorProvider,
};
use fetch_store::{Query, QueryResolver, StorageAdapter};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{RepositoryError, RepositoryResult};

/// Projection applied to a repository's base query before resolving.
pub type Projection<T, R> = Box<dyn FnOnce(Query<T>) -> Query<R> + Send>;

/// Apply `projection` to `query`. A missing projection is an argument error.
pub fn project<T, R>(
    query: Query<T>,
    projection: Option<Projection<T, R>>,
) -> RepositoryResult<QueryResolver<R>>
where
    R: Send + 'static,
{
    let projection =
        projection.ok_or_else(|| RepositoryError::argument("a projection is required"))?;
    Ok(QueryResolver::new(projection(query)))
}

/// Persistence surface for one entity type.
///
/// Reads bypass the processor pipeline and never track what they return.
/// Writes run the pre-stage, touch storage, accept the entity's changes, then
/// run the post-stage.
#[async_trait]
pub trait EntityRepository<T: Entity>: Send + Sync {
    /// Look up one entity by keys.
    async fn find(&self, keys: &Keys, cancel: &CancellationToken) -> RepositoryResult<Option<T>>;

    /// A lazy, non-tracking query over every entity.
    fn get(&self) -> Query<T>;

    /// Terminal operators over [`Self::get`].
    fn query_resolver(&self) -> QueryResolver<T> {
        QueryResolver::new(self.get())
    }

    /// Terminal operators over a projection of [`Self::get`].
    fn query_resolver_with<R>(&self, projection: Option<Projection<T, R>>) -> RepositoryResult<QueryResolver<R>>
    where
        Self: Sized,
        R: Send + 'static,
    {
        project(self.get(), projection)
    }

    /// Store a new entity and return its keys.
    async fn add(&self, entity: &mut T, cancel: &CancellationToken) -> RepositoryResult<Keys>;

    /// Persist the entity's pending changes and return the set that was
    /// applied.
    async fn update(&self, entity: &mut T, cancel: &CancellationToken) -> RepositoryResult<ChangeSet>;

    /// Remove the entity.
    async fn delete(&self, entity: &T, cancel: &CancellationToken) -> RepositoryResult<()>;
}

impl<T: Entity> dyn EntityRepository<T> + '_ {
    /// [`EntityRepository::query_resolver_with`] for trait objects such as
    /// the ones handed out by the registrar.
    pub fn query_resolver_projected<R>(
        &self,
        projection: Option<Projection<T, R>>,
    ) -> RepositoryResult<QueryResolver<R>>
    where
        R: Send + 'static,
    {
        project(self.get(), projection)
    }
}

fn ensure_completed(report: &PipelineReport) -> RepositoryResult<()> {
    match &report.outcome {
        PipelineOutcome::Completed => Ok(()),
        PipelineOutcome::Cancelled { processor, reason } => Err(RepositoryError::OperationCancelled {
            stage: report.stage,
            processor: processor.clone(),
            reason: reason.clone(),
        }),
    }
}

fn ensure_live(cancel: &CancellationToken) -> RepositoryResult<()> {
    if cancel.is_cancelled() {
        return Err(RepositoryError::Cancelled);
    }
    Ok(())
}

/// The default repository over a storage adapter.
pub struct Repository<T, S> {
    store: Arc<S>,
    pipeline: ProcessorPipeline<T>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> Repository<T, S>
where
    T: Entity,
    S: StorageAdapter<T>,
{
    /// Create a repository whose pipeline is resolved from `provider`.
    pub fn new(store: Arc<S>, provider: &dyn ProcessorProvider<T>, config: PipelineConfig) -> Self {
        Self {
            store,
            pipeline: ProcessorPipeline::new(provider, config),
            _entity: PhantomData,
        }
    }

    /// Create a repository with no processors.
    pub fn without_processors(store: Arc<S>) -> Self {
        Self {
            store,
            pipeline: ProcessorPipeline::empty(),
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn pipeline(&self) -> &ProcessorPipeline<T> {
        &self.pipeline
    }
}

#[async_trait]
impl<T, S> EntityRepository<T> for Repository<T, S>
where
    T: Entity,
    S: StorageAdapter<T> + 'static,
{
    async fn find(&self, keys: &Keys, cancel: &CancellationToken) -> RepositoryResult<Option<T>> {
        debug!(entity = T::entity_name(), %keys, "find");
        Ok(self.store.find(keys, cancel).await?)
    }

    fn get(&self) -> Query<T> {
        self.store.query()
    }

    async fn add(&self, entity: &mut T, cancel: &CancellationToken) -> RepositoryResult<Keys> {
        debug!(entity = T::entity_name(), "add");
        ensure_completed(&self.pipeline.adding(entity, cancel).await?)?;

        let keys = self.store.insert(entity, cancel).await?;
        entity.accept_changes();

        ensure_live(cancel)?;
        self.pipeline.added(entity, cancel).await?;
        debug!(entity = T::entity_name(), %keys, "added");
        Ok(keys)
    }

    async fn update(&self, entity: &mut T, cancel: &CancellationToken) -> RepositoryResult<ChangeSet> {
        let changes = entity.extract_changes()?;
        debug!(entity = T::entity_name(), changes = changes.len(), "update");

        let (report, changes) = self.pipeline.updating(entity, changes, cancel).await?;
        ensure_completed(&report)?;

        let applied = self.store.apply_changes(entity, &changes, cancel).await?;
        entity.accept_changes();
        if applied.is_noop() {
            debug!(entity = T::entity_name(), skipped = applied.skipped.len(), "no stored member changed");
        } else {
            debug!(
                entity = T::entity_name(),
                applied = applied.applied.len(),
                skipped = applied.skipped.len(),
                "updated"
            );
        }

        ensure_live(cancel)?;
        self.pipeline.updated(entity, &changes, cancel).await?;
        Ok(changes)
    }

    async fn delete(&self, entity: &T, cancel: &CancellationToken) -> RepositoryResult<()> {
        debug!(entity = T::entity_name(), "delete");
        ensure_completed(&self.pipeline.deleting(entity, cancel).await?)?;

        self.store.remove(entity, cancel).await?;

        ensure_live(cancel)?;
        self.pipeline.deleted(entity, cancel).await?;
        Ok(())
    }
}
