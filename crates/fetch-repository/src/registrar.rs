use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use fetch_change::Entity;
use fetch_processors::{PipelineConfig, ProcessorProvider};
use fetch_store::StorageAdapter;
use tracing::{debug, info};

use crate::repository::{EntityRepository, Repository};

/// Binds entity types to repositories over one shared storage context.
///
/// Registration is try-add: the first repository registered for a type
/// wins and later registrations for it are ignored. Each repository is
/// reachable both through its entity type and through its concrete type.
pub struct RepositoryRegistrar<S> {
    store: Arc<S>,
    pipeline: PipelineConfig,
    repositories: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    concrete: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl<S> RepositoryRegistrar<S>
where
    S: Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, pipeline: PipelineConfig) -> Self {
        Self {
            store,
            pipeline,
            repositories: HashMap::new(),
            concrete: HashMap::new(),
        }
    }

    /// The shared storage context.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Number of registered entity types.
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Returns `true` if `T` has a repository.
    pub fn contains<T: Entity>(&self) -> bool {
        self.repositories.contains_key(&TypeId::of::<T>())
    }

    /// Bind the default [`Repository`] for `T`. Returns `false` if `T` was
    /// already registered.
    pub fn register<T>(&mut self, provider: &dyn ProcessorProvider<T>) -> bool
    where
        T: Entity,
        S: StorageAdapter<T>,
    {
        self.register_custom::<T, _, _>(provider, |repository| repository)
    }

    /// Bind a custom repository for `T`, built by `factory` around the
    /// default one. Returns `false` if `T` was already registered, in which
    /// case `factory` is not called.
    pub fn register_custom<T, R, F>(&mut self, provider: &dyn ProcessorProvider<T>, factory: F) -> bool
    where
        T: Entity,
        S: StorageAdapter<T>,
        R: EntityRepository<T> + 'static,
        F: FnOnce(Repository<T, S>) -> R,
    {
        let id = TypeId::of::<T>();
        if self.repositories.contains_key(&id) {
            debug!(entity = T::entity_name(), "repository already registered");
            return false;
        }
        let default = Repository::new(Arc::clone(&self.store), provider, self.pipeline.clone());
        let concrete = Arc::new(factory(default));
        let repository: Arc<dyn EntityRepository<T>> = concrete.clone();
        self.repositories.insert(id, Box::new(repository));
        let entry: Box<dyn Any + Send + Sync> = Box::new(concrete);
        self.concrete.entry(TypeId::of::<R>()).or_insert(entry);
        info!(entity = T::entity_name(), "repository registered");
        true
    }

    /// The repository registered for `T`.
    pub fn resolve<T: Entity>(&self) -> Option<Arc<dyn EntityRepository<T>>> {
        self.repositories
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Arc<dyn EntityRepository<T>>>())
            .cloned()
    }

    /// The registered repository whose concrete type is `R`, for callers
    /// that need more than [`EntityRepository`].
    pub fn resolve_as<R>(&self) -> Option<Arc<R>>
    where
        R: Send + Sync + 'static,
    {
        self.concrete
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.downcast_ref::<Arc<R>>())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryResult;
    use crate::test_entity::TestEntity;
    use async_trait::async_trait;
    use fetch_change::{ChangeSet, Keys};
    use fetch_processors::{ProcessorRegistry, Stage};
    use fetch_store::{InMemoryStore, Query};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    /// Counts adds, then defers to the default repository.
    struct CountingRepository {
        inner: Repository<TestEntity, InMemoryStore>,
        adds: Arc<AtomicUsize>,
    }

    impl CountingRepository {
        fn adds(&self) -> usize {
            self.adds.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EntityRepository<TestEntity> for CountingRepository {
        async fn find(&self, keys: &Keys, cancel: &CancellationToken) -> RepositoryResult<Option<TestEntity>> {
            self.inner.find(keys, cancel).await
        }

        fn get(&self) -> Query<TestEntity> {
            self.inner.get()
        }

        async fn add(&self, entity: &mut TestEntity, cancel: &CancellationToken) -> RepositoryResult<Keys> {
            self.adds.fetch_add(1, Ordering::SeqCst);
            self.inner.add(entity, cancel).await
        }

        async fn update(&self, entity: &mut TestEntity, cancel: &CancellationToken) -> RepositoryResult<ChangeSet> {
            self.inner.update(entity, cancel).await
        }

        async fn delete(&self, entity: &TestEntity, cancel: &CancellationToken) -> RepositoryResult<()> {
            self.inner.delete(entity, cancel).await
        }
    }

    fn registrar() -> RepositoryRegistrar<InMemoryStore> {
        RepositoryRegistrar::new(Arc::new(InMemoryStore::new()), PipelineConfig::default())
    }

    #[tokio::test]
    async fn registers_and_resolves_default_repository() {
        let mut registrar = registrar();
        assert!(registrar.resolve::<TestEntity>().is_none());
        assert!(registrar.register::<TestEntity>(&ProcessorRegistry::<TestEntity>::new()));
        assert!(registrar.contains::<TestEntity>());

        let repo = registrar.resolve::<TestEntity>().unwrap();
        let cancel = CancellationToken::new();
        let keys = repo.add(&mut TestEntity::with_int(4), &cancel).await.unwrap();
        assert_eq!(registrar.store().len("test_entities").unwrap(), 1);
        assert_eq!(repo.find(&keys, &cancel).await.unwrap().unwrap().int_value, 4);
    }

    #[tokio::test]
    async fn custom_repository_wraps_default() {
        let mut registrar = registrar();
        let adds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&adds);
        assert!(registrar.register_custom::<TestEntity, _, _>(
            &ProcessorRegistry::<TestEntity>::new(),
            move |inner| CountingRepository { inner, adds: counter },
        ));

        let repo = registrar.resolve::<TestEntity>().unwrap();
        repo.add(&mut TestEntity::with_int(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(adds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolves_by_concrete_type() {
        let mut registrar = registrar();
        assert!(registrar.resolve_as::<CountingRepository>().is_none());
        registrar.register_custom::<TestEntity, _, _>(&ProcessorRegistry::<TestEntity>::new(), |inner| {
            CountingRepository {
                inner,
                adds: Arc::new(AtomicUsize::new(0)),
            }
        });

        let shared = registrar.resolve::<TestEntity>().unwrap();
        shared
            .add(&mut TestEntity::with_int(2), &CancellationToken::new())
            .await
            .unwrap();
        let counting = registrar.resolve_as::<CountingRepository>().unwrap();
        assert_eq!(counting.adds(), 1);
        assert!(registrar
            .resolve_as::<Repository<TestEntity, InMemoryStore>>()
            .is_none());
    }

    #[test]
    fn default_repository_resolves_by_concrete_type() {
        let mut registrar = registrar();
        registrar.register::<TestEntity>(&ProcessorRegistry::<TestEntity>::new());
        let repo = registrar
            .resolve_as::<Repository<TestEntity, InMemoryStore>>()
            .unwrap();
        assert_eq!(repo.pipeline().processor_count(Stage::Adding), 0);
    }

    #[test]
    fn first_registration_wins() {
        let mut registrar = registrar();
        assert!(registrar.register::<TestEntity>(&ProcessorRegistry::<TestEntity>::new()));

        let mut called = false;
        let added = registrar.register_custom::<TestEntity, _, _>(&ProcessorRegistry::<TestEntity>::new(), |inner| {
            called = true;
            inner
        });
        assert!(!added);
        assert!(!called);
        assert_eq!(registrar.len(), 1);
    }
}
