use crate::Result;
use crate::handler::Action;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Defaults applied to requests that leave a key out, plus batch limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub default_prefix: String,
    pub default_action: Action,
    pub default_count: i64,
    /// Upper bound on generator calls in one batch. Unbounded when unset.
    pub max_attempts: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            default_prefix: "CP".to_string(),
            default_action: Action::GenerateSingle,
            default_count: 1,
            max_attempts: None,
        }
    }
}

impl GeneratorConfig {
    /// Load a TOML config file. Keys that are absent keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: GeneratorConfig = toml::from_str(&content)?;
        tracing::debug!(?config, "loaded generator config");
        Ok(config)
    }
}
