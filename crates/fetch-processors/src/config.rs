use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a processor pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// When `false`, every stage completes immediately without invoking any
    /// processor.
    pub enabled: bool,
    /// Upper bound for a single processor invocation, in milliseconds.
    pub processor_timeout_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            processor_timeout_ms: None,
        }
    }
}

impl PipelineConfig {
    /// A configuration with every stage disabled.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// The per-processor time limit, if one is configured.
    pub fn processor_timeout(&self) -> Option<Duration> {
        self.processor_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert!(config.enabled);
        assert!(config.processor_timeout().is_none());
        assert!(!PipelineConfig::disabled().enabled);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: PipelineConfig = toml::from_str("processor_timeout_ms = 250").unwrap();
        assert!(config.enabled);
        assert_eq!(config.processor_timeout(), Some(Duration::from_millis(250)));
    }
}
