use std::path::Path;

use fetch_processors::PipelineConfig;
use fetch_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, RepositoryResult};

/// Pagination settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Reject pages whose order key does not separate adjacent rows.
    pub strict_ordering: bool,
}

/// Top-level configuration, one section per concern.
///
/// ```toml
/// [pipeline]
/// processor_timeout_ms = 500
///
/// [store]
/// collection_changes = "coarsen"
///
/// [pagination]
/// strict_ordering = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub pipeline: PipelineConfig,
    pub store: StoreConfig,
    pub pagination: PaginationConfig,
}

impl FetchConfig {
    /// Parse from TOML. Missing sections and fields take their defaults.
    pub fn from_toml_str(source: &str) -> RepositoryResult<Self> {
        toml::from_str(source).map_err(|e| RepositoryError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| RepositoryError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> RepositoryResult<String> {
        toml::to_string_pretty(self).map_err(|e| RepositoryError::Config(e.to_string()))
    }
}
