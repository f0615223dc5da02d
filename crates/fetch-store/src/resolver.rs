use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::error::{StoreError, StoreResult};
use crate::query::Query;

/// Terminal operators over a [`Query`].
///
/// Every operator takes a cancellation token and has a `_where` variant
/// that filters first. `first` and `single` are strict; the `_or_default`
/// variants return `None` instead of [`StoreError::NoMatch`].
pub struct QueryResolver<T> {
    query: Query<T>,
}

impl<T> Clone for QueryResolver<T> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
        }
    }
}

impl<T> fmt::Debug for QueryResolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResolver").field("query", &self.query).finish()
    }
}

impl<T: Send + 'static> QueryResolver<T> {
    pub fn new(query: Query<T>) -> Self {
        Self { query }
    }

    /// The underlying query.
    pub fn query(&self) -> &Query<T> {
        &self.query
    }

    fn filtered<F>(&self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::new(self.query.clone().filter(predicate))
    }

    /// Returns `true` if any row exists.
    pub async fn any(&self, cancel: &CancellationToken) -> StoreResult<bool> {
        let rows = self.query.clone().take(1).load(cancel).await?;
        Ok(!rows.is_empty())
    }

    pub async fn any_where<F>(&self, predicate: F, cancel: &CancellationToken) -> StoreResult<bool>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filtered(predicate).any(cancel).await
    }

    /// Number of rows.
    pub async fn count(&self, cancel: &CancellationToken) -> StoreResult<usize> {
        Ok(self.query.load(cancel).await?.len())
    }

    pub async fn count_where<F>(&self, predicate: F, cancel: &CancellationToken) -> StoreResult<usize>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filtered(predicate).count(cancel).await
    }

    /// The first row. Fails with [`StoreError::NoMatch`] when there is none.
    pub async fn first(&self, cancel: &CancellationToken) -> StoreResult<T> {
        self.first_or_default(cancel).await?.ok_or(StoreError::NoMatch)
    }

    pub async fn first_where<F>(&self, predicate: F, cancel: &CancellationToken) -> StoreResult<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filtered(predicate).first(cancel).await
    }

    /// The first row, or `None`.
    pub async fn first_or_default(&self, cancel: &CancellationToken) -> StoreResult<Option<T>> {
        let rows = self.query.clone().take(1).load(cancel).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn first_or_default_where<F>(
        &self,
        predicate: F,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filtered(predicate).first_or_default(cancel).await
    }

    /// The only row. Fails with [`StoreError::NoMatch`] when there is none
    /// and [`StoreError::MultipleMatches`] when there are several.
    pub async fn single(&self, cancel: &CancellationToken) -> StoreResult<T> {
        self.single_or_default(cancel).await?.ok_or(StoreError::NoMatch)
    }

    pub async fn single_where<F>(&self, predicate: F, cancel: &CancellationToken) -> StoreResult<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filtered(predicate).single(cancel).await
    }

    /// The only row, or `None`. Still fails with
    /// [`StoreError::MultipleMatches`] when there are several.
    pub async fn single_or_default(&self, cancel: &CancellationToken) -> StoreResult<Option<T>> {
        let mut rows = self.query.load(cancel).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            count => Err(StoreError::MultipleMatches { count }),
        }
    }

    pub async fn single_or_default_where<F>(
        &self,
        predicate: F,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filtered(predicate).single_or_default(cancel).await
    }

    /// Every row.
    pub async fn to_list(&self, cancel: &CancellationToken) -> StoreResult<Vec<T>> {
        self.query.load(cancel).await
    }

    pub async fn to_list_where<F>(&self, predicate: F, cancel: &CancellationToken) -> StoreResult<Vec<T>>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filtered(predicate).to_list(cancel).await
    }
}

impl<T> From<Query<T>> for QueryResolver<T> {
    fn from(query: Query<T>) -> Self {
        Self { query }
    }
}
