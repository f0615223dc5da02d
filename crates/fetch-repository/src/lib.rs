//! Change-tracking repositories.
//!
//! A [`Repository`] persists one entity type through a
//! [`StorageAdapter`](fetch_store::StorageAdapter). Writes run through the
//! processor pipeline and send only the entity's extracted changes to
//! storage; reads bypass the pipeline and hand out untracked instances.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fetch_repository::{EntityRepository, Repository};
//! use fetch_store::InMemoryStore;
//! use tokio_util::sync::CancellationToken;
//!
//! let repo = Repository::without_processors(Arc::new(InMemoryStore::new()));
//! let cancel = CancellationToken::new();
//! let keys = repo.add(&mut account, &cancel).await?;
//! account.set_balance(10);
//! let applied = repo.update(&mut account, &cancel).await?;
//! ```

pub mod config;
pub mod error;
pub mod pagination;
pub mod registrar;
pub mod repository;

#[cfg(test)]
mod test_entity;

// Re-exports for convenience.
pub use config::{FetchConfig, PaginationConfig};
pub use error::{RepositoryError, RepositoryResult};
pub use pagination::{PageInfo, PaginationEngine, QueryFilter, ResultPage};
pub use registrar::RepositoryRegistrar;
pub use repository::{project, EntityRepository, Projection, Repository};
