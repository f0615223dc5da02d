use serde::{Deserialize, Serialize};

/// What an adapter does with a change path that addresses a collection
/// element (an `Index` or `Key` segment).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionChangePolicy {
    /// Leave the path unpersisted, log a warning and report it as skipped.
    #[default]
    Skip,
    /// Persist the entity's current value of the member owning the
    /// collection instead.
    Coarsen,
    /// Fail the whole apply with [`crate::StoreError::UnsupportedPath`].
    Reject,
}

/// Configuration for storage adapters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub collection_changes: CollectionChangePolicy,
}

impl StoreConfig {
    pub fn with_collection_changes(policy: CollectionChangePolicy) -> Self {
        Self {
            collection_changes: policy,
        }
    }
}
