use async_trait::async_trait;
use fetch_change::{ChangeSet, Entity, Keys};
use tokio_util::sync::CancellationToken;

use crate::error::StoreResult;
use crate::query::Query;
use crate::resolution::ApplyReport;

/// The persistence collaborator behind a repository.
///
/// All implementations must satisfy these invariants:
/// - Every suspending operation fails with
///   [`StoreError::Cancelled`](crate::StoreError::Cancelled) once `cancel`
///   has fired, before touching storage.
/// - Entities handed out by `find` and `query` are fresh instances with
///   empty change logs; the adapter never tracks what it returns.
/// - `apply_changes` writes exactly the properties named by the change set
///   and leaves every other stored property as it was.
/// - A failed operation leaves storage unchanged.
#[async_trait]
pub trait StorageAdapter<T: Entity>: Send + Sync {
    /// Look up one entity by keys. Returns `Ok(None)` if there is no row.
    async fn find(&self, keys: &Keys, cancel: &CancellationToken) -> StoreResult<Option<T>>;

    /// A lazy, non-tracking query over every stored entity.
    fn query(&self) -> Query<T>;

    /// Store a new entity and return its keys.
    ///
    /// Adapters that generate keys write the generated part back with
    /// [`Entity::assign_generated_key`] when [`Entity::keys`] reports an
    /// incomplete identity, then read the full tuple from [`Entity::keys`].
    async fn insert(&self, entity: &mut T, cancel: &CancellationToken) -> StoreResult<Keys>;

    /// Remove the row for `entity`'s keys.
    async fn remove(&self, entity: &T, cancel: &CancellationToken) -> StoreResult<()>;

    /// Persist only the paths in `changes` for `entity`'s row.
    async fn apply_changes(
        &self,
        entity: &T,
        changes: &ChangeSet,
        cancel: &CancellationToken,
    ) -> StoreResult<ApplyReport>;
}
