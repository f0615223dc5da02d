//! Lazy, composable query pipelines.
//!
//! A [`Query`] describes how to produce a list of rows but does not touch
//! storage until [`Query::load`] is awaited. Operators wrap the upstream
//! source, so a query can be cloned and extended independently.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{StoreError, StoreResult};

/// Produces the rows a [`Query`] operates on.
#[async_trait]
pub trait QuerySource<T>: Send + Sync {
    /// Materialize every row. Must fail with [`StoreError::Cancelled`] if
    /// `cancel` has fired.
    async fn load(&self, cancel: &CancellationToken) -> StoreResult<Vec<T>>;
}

type Operator<T, R> = Box<dyn Fn(Vec<T>) -> Vec<R> + Send + Sync>;

/// A source that applies an in-memory operator to its upstream's rows.
struct Transform<T, R> {
    upstream: Arc<dyn QuerySource<T>>,
    op: Operator<T, R>,
}

#[async_trait]
impl<T, R> QuerySource<R> for Transform<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    async fn load(&self, cancel: &CancellationToken) -> StoreResult<Vec<R>> {
        let rows = self.upstream.load(cancel).await?;
        Ok((self.op)(rows))
    }
}

/// A fixed list of rows, cloned on every load.
struct VecSource<T> {
    rows: Arc<Vec<T>>,
}

#[async_trait]
impl<T> QuerySource<T> for VecSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn load(&self, cancel: &CancellationToken) -> StoreResult<Vec<T>> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(self.rows.as_ref().clone())
    }
}

/// A lazy query over rows of `T`.
pub struct Query<T> {
    source: Arc<dyn QuerySource<T>>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Query<T> {
    /// Wrap a source.
    pub fn new<S>(source: S) -> Self
    where
        S: QuerySource<T> + 'static,
    {
        Self {
            source: Arc::new(source),
        }
    }

    /// A query over a fixed list of rows.
    pub fn from_vec(rows: Vec<T>) -> Self
    where
        T: Clone + Sync,
    {
        Self::new(VecSource {
            rows: Arc::new(rows),
        })
    }

    fn then<R, F>(self, op: F) -> Query<R>
    where
        R: Send + 'static,
        F: Fn(Vec<T>) -> Vec<R> + Send + Sync + 'static,
    {
        Query::new(Transform {
            upstream: self.source,
            op: Box::new(op),
        })
    }

    /// Keep rows matching `predicate`.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.then(move |rows| rows.into_iter().filter(|row| predicate(row)).collect())
    }

    /// Project every row.
    pub fn map<R, F>(self, projection: F) -> Query<R>
    where
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        self.then(move |rows| rows.into_iter().map(&projection).collect())
    }

    /// Sort ascending by `key`. The sort is stable.
    pub fn order_by<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.sorted(move |a, b| key(a).cmp(&key(b)))
    }

    /// Sort descending by `key`. The sort is stable.
    pub fn order_by_desc<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.sorted(move |a, b| key(b).cmp(&key(a)))
    }

    fn sorted<F>(self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.then(move |mut rows| {
            rows.sort_by(&compare);
            rows
        })
    }

    /// Drop the first `count` rows.
    pub fn skip(self, count: usize) -> Self {
        self.then(move |rows| rows.into_iter().skip(count).collect())
    }

    /// Keep at most `count` rows.
    pub fn take(self, count: usize) -> Self {
        self.then(move |rows| rows.into_iter().take(count).collect())
    }

    /// Run the pipeline.
    pub async fn load(&self, cancel: &CancellationToken) -> StoreResult<Vec<T>> {
        self.source.load(cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers() -> Query<i32> {
        Query::from_vec(vec![5, 3, 9, 1, 7])
    }

    #[tokio::test]
    async fn operators_compose_in_order() {
        let rows = numbers()
            .filter(|n| *n > 1)
            .order_by(|n| *n)
            .skip(1)
            .take(2)
            .map(|n| n * 10)
            .load(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(rows, vec![50, 70]);
    }

    #[tokio::test]
    async fn order_by_is_stable() {
        let rows = Query::from_vec(vec![(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd')])
            .order_by(|(k, _)| *k)
            .load(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(rows, vec![(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c')]);

        let desc = numbers()
            .order_by_desc(|n| *n)
            .load(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(desc, vec![9, 7, 5, 3, 1]);
    }

    #[tokio::test]
    async fn clones_extend_independently() {
        let base = numbers();
        let small = base.clone().filter(|n| *n < 5);
        let cancel = CancellationToken::new();
        assert_eq!(base.load(&cancel).await.unwrap().len(), 5);
        assert_eq!(small.load(&cancel).await.unwrap(), vec![3, 1]);
    }

    #[tokio::test]
    async fn load_honours_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = numbers().take(1).load(&cancel).await.unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
    }
}
