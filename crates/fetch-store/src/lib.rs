//! Storage layer for fetch repositories.
//!
//! Defines the [`StorageAdapter`] contract a repository persists through,
//! the lazy [`Query`] surface and its terminal [`QueryResolver`], and the
//! rules for turning a [`ChangeSet`](fetch_change::ChangeSet) into a partial
//! update ([`resolve_path`]).
//!
//! # Backends
//!
//! - [`InMemoryStore`] -- JSON documents in memory, for tests and embedding
//!
//! # Invariants
//!
//! 1. Reads never hand out tracked instances: every load deserializes fresh
//!    entities with empty change logs.
//! 2. A partial update writes exactly the properties named by the change
//!    set; collection paths follow [`CollectionChangePolicy`].
//! 3. A failed apply leaves the stored row as it was.

pub mod config;
pub mod error;
pub mod memory;
pub mod query;
pub mod resolution;
pub mod resolver;
pub mod traits;

pub use config::{CollectionChangePolicy, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use query::{Query, QuerySource};
pub use resolution::{resolve_path, ApplyReport, PathResolution};
pub use resolver::QueryResolver;
pub use traits::StorageAdapter;
