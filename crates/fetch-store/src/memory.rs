use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use fetch_change::{ChangeError, ChangePath, ChangePathSegment, ChangeSet, Entity, KeyPart, Keys};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{CollectionChangePolicy, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::query::{Query, QuerySource};
use crate::resolution::{read_at, resolve_path, write_property, ApplyReport, PathResolution};
use crate::traits::StorageAdapter;

/// Rows of one entity set, keyed by entity keys and stored as JSON
/// documents.
#[derive(Debug)]
struct Table {
    rows: BTreeMap<Keys, Value>,
    next_id: i64,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

type Tables = Arc<RwLock<HashMap<&'static str, Table>>>;

/// In-memory storage adapter.
///
/// Intended for tests and embedding. Rows are held as JSON documents behind
/// a `RwLock`, one table per [`Entity::entity_name`]. Every read
/// deserializes fresh instances, so nothing handed out is tracked. Clones
/// share the same tables.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    tables: Tables,
    config: StoreConfig,
}

impl InMemoryStore {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with `config`.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            tables: Tables::default(),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of rows stored for `entity_name`.
    pub fn len(&self, entity_name: &str) -> StoreResult<usize> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.get(entity_name).map_or(0, |table| table.rows.len()))
    }

    /// Returns `true` if no table holds a row.
    pub fn is_empty(&self) -> StoreResult<bool> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.values().all(|table| table.rows.is_empty()))
    }

    /// The raw stored document for a row.
    pub fn document(&self, entity_name: &str, keys: &Keys) -> StoreResult<Option<Value>> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables
            .get(entity_name)
            .and_then(|table| table.rows.get(keys))
            .cloned())
    }

    fn insert_row<T: Entity>(&self, entity: &mut T) -> StoreResult<Keys> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let table = tables.entry(T::entity_name()).or_default();

        let keys = match entity.keys() {
            Ok(keys) => keys,
            Err(ChangeError::InvalidState(_)) => {
                let id = table.next_id;
                entity.assign_generated_key(KeyPart::Int(id))?;
                table.next_id += 1;
                entity.keys()?
            }
            Err(err) => return Err(err.into()),
        };

        if table.rows.contains_key(&keys) {
            return Err(StoreError::DuplicateKey {
                entity: T::entity_name(),
                keys,
            });
        }
        if let Some(id) = keys.parts().last().and_then(|part| part.as_int()) {
            table.next_id = table.next_id.max(id.saturating_add(1));
        }

        let document = serde_json::to_value(&*entity)?;
        table.rows.insert(keys.clone(), document);
        Ok(keys)
    }

    fn remove_row<T: Entity>(&self, keys: Keys) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let removed = tables
            .get_mut(T::entity_name())
            .and_then(|table| table.rows.remove(&keys));
        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                entity: T::entity_name(),
                keys,
            }),
        }
    }

    fn apply_row<T: Entity>(&self, entity: &T, changes: &ChangeSet) -> StoreResult<ApplyReport> {
        let keys = entity.keys()?;
        let shape = T::shape();
        let mut current: Option<Value> = None;
        let mut report = ApplyReport::default();

        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let row = tables
            .get_mut(T::entity_name())
            .and_then(|table| table.rows.get_mut(&keys))
            .ok_or_else(|| StoreError::NotFound {
                entity: T::entity_name(),
                keys: keys.clone(),
            })?;
        let mut document = row.clone();

        for change in changes {
            let path = &change.path;
            if !path.resolve(&shape) {
                return Err(StoreError::ShapeMismatch {
                    path: path.clone(),
                    reason: format!("not a member path of {}", T::entity_name()),
                });
            }
            match resolve_path(path) {
                PathResolution::Property { unit, property } => {
                    write_property(&mut document, path, &unit, property, change.value.clone())?;
                    report.applied.push(path.clone());
                }
                PathResolution::Unsupported { owner, segment } => match self.config.collection_changes {
                    CollectionChangePolicy::Skip => {
                        warn!(%path, %segment, "collection change not persisted");
                        report.skipped.push(path.clone());
                    }
                    CollectionChangePolicy::Reject => {
                        return Err(StoreError::UnsupportedPath(path.clone()));
                    }
                    CollectionChangePolicy::Coarsen => {
                        let Some((member, unit)) = owner.split_last() else {
                            return Err(StoreError::UnsupportedPath(path.clone()));
                        };
                        let owner_path = owner_path(&owner);
                        if report.coarsened.contains(&owner_path) {
                            continue;
                        }
                        let snapshot = match current.take() {
                            Some(snapshot) => snapshot,
                            None => serde_json::to_value(entity)?,
                        };
                        let value = read_at(&snapshot, &owner).cloned().unwrap_or(Value::Null);
                        current = Some(snapshot);
                        write_property(&mut document, path, unit, member, value)?;
                        debug!(%path, member = %owner_path, "collection change coarsened");
                        report.coarsened.push(owner_path);
                    }
                },
            }
        }

        serde_json::from_value::<T>(document.clone()).map_err(|err| {
            StoreError::Serialization(format!(
                "{} row {keys} would no longer load: {err}",
                T::entity_name()
            ))
        })?;
        *row = document;
        Ok(report)
    }
}

fn owner_path(owner: &[&str]) -> ChangePath {
    let mut names = owner.iter();
    let mut path = ChangePath::property(names.next().copied().unwrap_or_default());
    for name in names {
        path = path.child(ChangePathSegment::Property((*name).to_string()));
    }
    path
}

fn check(cancel: &CancellationToken) -> StoreResult<()> {
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }
    Ok(())
}

/// Loads every row of one table, deserializing fresh instances.
struct TableSource<T> {
    tables: Tables,
    _entity: PhantomData<fn() -> T>,
}

#[async_trait]
impl<T: Entity> QuerySource<T> for TableSource<T> {
    async fn load(&self, cancel: &CancellationToken) -> StoreResult<Vec<T>> {
        check(cancel)?;
        let documents: Vec<Value> = {
            let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
            tables
                .get(T::entity_name())
                .map(|table| table.rows.values().cloned().collect())
                .unwrap_or_default()
        };
        documents
            .into_iter()
            .map(|document| serde_json::from_value(document).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl<T: Entity> StorageAdapter<T> for InMemoryStore {
    async fn find(&self, keys: &Keys, cancel: &CancellationToken) -> StoreResult<Option<T>> {
        check(cancel)?;
        debug!(entity = T::entity_name(), %keys, "find");
        self.document(T::entity_name(), keys)?
            .map(|document| serde_json::from_value(document).map_err(StoreError::from))
            .transpose()
    }

    fn query(&self) -> Query<T> {
        Query::new(TableSource {
            tables: Arc::clone(&self.tables),
            _entity: PhantomData,
        })
    }

    async fn insert(&self, entity: &mut T, cancel: &CancellationToken) -> StoreResult<Keys> {
        check(cancel)?;
        let keys = self.insert_row(entity)?;
        debug!(entity = T::entity_name(), %keys, "inserted");
        Ok(keys)
    }

    async fn remove(&self, entity: &T, cancel: &CancellationToken) -> StoreResult<()> {
        check(cancel)?;
        let keys = entity.keys()?;
        debug!(entity = T::entity_name(), %keys, "remove");
        self.remove_row::<T>(keys)
    }

    async fn apply_changes(
        &self,
        entity: &T,
        changes: &ChangeSet,
        cancel: &CancellationToken,
    ) -> StoreResult<ApplyReport> {
        check(cancel)?;
        let report = self.apply_row(entity, changes)?;
        debug!(
            entity = T::entity_name(),
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            coarsened = report.coarsened.len(),
            "changes applied"
        );
        Ok(report)
    }
}
