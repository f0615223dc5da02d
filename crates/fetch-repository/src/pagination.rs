//! Offset pagination over a repository's base query.

use std::sync::Arc;

use fetch_change::Entity;
use fetch_store::Query;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::PaginationConfig;
use crate::error::{RepositoryError, RepositoryResult};
use crate::repository::EntityRepository;

/// A zero-based page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    page: usize,
    page_size: usize,
}

impl PageInfo {
    /// Fails with [`RepositoryError::Argument`] when `page_size` is zero.
    pub fn new(page: usize, page_size: usize) -> RepositoryResult<Self> {
        if page_size == 0 {
            return Err(RepositoryError::argument("page size must be greater than zero"));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of rows before this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }

    /// The following page.
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            page_size: self.page_size,
        }
    }
}

/// One page of results.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultPage<T> {
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<T>,
}

impl<T> ResultPage<T> {
    /// Number of results on this page; never more than `page_size`.
    pub fn count(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns `true` if this page is full, so a following page may exist.
    pub fn is_full(&self) -> bool {
        self.results.len() == self.page_size
    }
}

/// Row filter applied before counting or paging.
pub type QueryFilter<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

type BaseQuery<T> = Arc<dyn Fn() -> Query<T> + Send + Sync>;
type OrderKey<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;

/// Counts and pages a base query ordered by a key.
///
/// The key should be unique across rows; pass a tuple to add a tiebreaker.
/// With [`PaginationConfig::strict_ordering`], a page that touches two
/// adjacent rows with equal keys is rejected instead of silently returning
/// an unstable partition.
pub struct PaginationEngine<T, K> {
    base: BaseQuery<T>,
    key: OrderKey<T, K>,
    config: PaginationConfig,
}

impl<T, K> PaginationEngine<T, K>
where
    T: Send + 'static,
    K: Ord + Send + 'static,
{
    pub fn new<B, F>(base: B, key: F, config: PaginationConfig) -> Self
    where
        B: Fn() -> Query<T> + Send + Sync + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self {
            base: Arc::new(base),
            key: Arc::new(key),
            config,
        }
    }

    fn filtered(&self, filter: Option<QueryFilter<T>>) -> Query<T> {
        let query = (self.base)();
        match filter {
            Some(filter) => query.filter(move |row| filter(row)),
            None => query,
        }
    }

    /// Number of rows matching `filter`.
    pub async fn count(
        &self,
        filter: Option<QueryFilter<T>>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<usize> {
        Ok(self.filtered(filter).load(cancel).await?.len())
    }

    /// Rows `[page*page_size, (page+1)*page_size)` of the filtered query in
    /// key order.
    pub async fn page(
        &self,
        info: PageInfo,
        filter: Option<QueryFilter<T>>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<ResultPage<T>> {
        let key = Arc::clone(&self.key);
        let ordered = self.filtered(filter).order_by(move |row| key(row));
        let offset = info.offset();

        let results = if self.config.strict_ordering {
            // Load one neighbour on each side so boundary ties are caught.
            let lead = offset.min(1);
            let mut window = ordered
                .skip(offset - lead)
                .take(info.page_size().saturating_add(lead + 1))
                .load(cancel)
                .await?;
            if let Some(position) = window
                .windows(2)
                .position(|pair| (self.key)(&pair[0]) == (self.key)(&pair[1]))
            {
                return Err(RepositoryError::argument(format!(
                    "order key is not unique near row {}",
                    offset - lead + position
                )));
            }
            window.truncate(info.page_size().saturating_add(lead));
            window.drain(..lead);
            window
        } else {
            ordered
                .skip(offset)
                .take(info.page_size())
                .load(cancel)
                .await?
        };

        debug!(page = info.page(), page_size = info.page_size(), count = results.len(), "page");
        Ok(ResultPage {
            page: info.page(),
            page_size: info.page_size(),
            results,
        })
    }
}

impl<T, K> PaginationEngine<T, K>
where
    T: Entity,
    K: Ord + Send + 'static,
{
    /// Page over `repository`'s base query.
    pub fn for_repository<F>(
        repository: Arc<dyn EntityRepository<T>>,
        key: F,
        config: PaginationConfig,
    ) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::new(move || repository.get(), key, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;
    use crate::test_entity::TestEntity;
    use fetch_store::InMemoryStore;
    use proptest::prelude::*;

    fn numbers(values: Vec<i64>) -> PaginationEngine<i64, i64> {
        PaginationEngine::new(
            move || Query::from_vec(values.clone()),
            |value: &i64| *value,
            PaginationConfig::default(),
        )
    }

    async fn all_pages(engine: &PaginationEngine<i64, i64>, page_size: usize) -> Vec<ResultPage<i64>> {
        let cancel = CancellationToken::new();
        let mut pages = Vec::new();
        let mut info = PageInfo::new(0, page_size).unwrap();
        loop {
            let page = engine.page(info, None, &cancel).await.unwrap();
            let full = page.is_full();
            pages.push(page);
            if !full {
                break;
            }
            info = info.next();
        }
        pages
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(matches!(PageInfo::new(0, 0), Err(RepositoryError::Argument(_))));
        assert_eq!(PageInfo::new(3, 10).unwrap().offset(), 30);
    }

    #[tokio::test]
    async fn hundred_rows_in_pages_of_ten() {
        let engine = numbers((0..100).rev().collect());
        let cancel = CancellationToken::new();
        assert_eq!(engine.count(None, &cancel).await.unwrap(), 100);

        for page in 0..10 {
            let result = engine
                .page(PageInfo::new(page, 10).unwrap(), None, &cancel)
                .await
                .unwrap();
            let expected: Vec<i64> = (page as i64 * 10..page as i64 * 10 + 10).collect();
            assert_eq!(result.results, expected);
            assert_eq!(result.count(), 10);
        }
        let past_end = engine
            .page(PageInfo::new(10, 10).unwrap(), None, &cancel)
            .await
            .unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn filter_applies_before_paging() {
        let engine = numbers((0..30).collect());
        let cancel = CancellationToken::new();
        let odd: QueryFilter<i64> = Arc::new(|value| value % 2 == 1);

        assert_eq!(engine.count(Some(odd.clone()), &cancel).await.unwrap(), 15);
        let page = engine
            .page(PageInfo::new(1, 4).unwrap(), Some(odd), &cancel)
            .await
            .unwrap();
        assert_eq!(page.results, vec![9, 11, 13, 15]);
    }

    #[tokio::test]
    async fn strict_ordering_rejects_ties() {
        let strict = PaginationConfig {
            strict_ordering: true,
        };
        let engine = PaginationEngine::new(
            || Query::from_vec(vec![1i64, 2, 2, 3, 4, 5]),
            |value: &i64| *value,
            strict,
        );
        let cancel = CancellationToken::new();

        // Page 0 of size 2 ends exactly between the tied rows.
        let err = engine
            .page(PageInfo::new(0, 2).unwrap(), None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Argument(_)));

        let middle = engine
            .page(PageInfo::new(1, 2).unwrap(), None, &cancel)
            .await;
        assert!(middle.is_err());
        let tail = engine
            .page(PageInfo::new(2, 2).unwrap(), None, &cancel)
            .await
            .unwrap();
        assert_eq!(tail.results, vec![4, 5]);
    }

    #[tokio::test]
    async fn strict_ordering_with_huge_page_size() {
        let engine = PaginationEngine::new(
            || Query::from_vec(vec![3i64, 1, 2]),
            |value: &i64| *value,
            PaginationConfig {
                strict_ordering: true,
            },
        );
        let cancel = CancellationToken::new();

        let first = engine
            .page(PageInfo::new(0, usize::MAX).unwrap(), None, &cancel)
            .await
            .unwrap();
        assert_eq!(first.results, vec![1, 2, 3]);
        assert!(!first.is_full());

        let beyond = engine
            .page(PageInfo::new(1, usize::MAX).unwrap(), None, &cancel)
            .await
            .unwrap();
        assert!(beyond.is_empty());
        assert_eq!(PageInfo::new(usize::MAX, 1).unwrap().next().page(), usize::MAX);
    }

    #[tokio::test]
    async fn pages_a_repository() {
        let repo: Arc<dyn EntityRepository<TestEntity>> =
            Arc::new(Repository::without_processors(Arc::new(InMemoryStore::new())));
        let cancel = CancellationToken::new();
        for value in (0..25).rev() {
            repo.add(&mut TestEntity::with_int(value), &cancel).await.unwrap();
        }

        let engine = PaginationEngine::for_repository(
            Arc::clone(&repo),
            |entity: &TestEntity| (entity.int_value, entity.id),
            PaginationConfig::default(),
        );
        let page = engine
            .page(PageInfo::new(2, 10).unwrap(), None, &cancel)
            .await
            .unwrap();
        let ints: Vec<i64> = page.results.iter().map(|e| e.int_value).collect();
        assert_eq!(ints, vec![20, 21, 22, 23, 24]);
        assert!(!page.is_full());
    }

    proptest! {
        #[test]
        fn pages_partition_the_ordered_set(
            values in proptest::collection::btree_set(-1000i64..1000, 0..60),
            page_size in 1usize..12,
        ) {
            let ordered: Vec<i64> = values.iter().copied().collect();
            let mut shuffled = ordered.clone();
            shuffled.reverse();
            let engine = numbers(shuffled);

            let pages = block_on(all_pages(&engine, page_size));
            let flattened: Vec<i64> = pages.iter().flat_map(|p| p.results.clone()).collect();
            prop_assert_eq!(flattened, ordered);
            for (index, page) in pages.iter().enumerate() {
                prop_assert_eq!(page.page, index);
                prop_assert!(page.count() <= page_size);
            }
        }
    }
}
