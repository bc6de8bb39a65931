use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::DefinitionError;

/// Selection of a plugin together with its (opaque) parameters
///
/// The parameters are interpreted by the plugin's constructor only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl PluginSpec {
    pub fn new(kind: impl Into<String>, params: Value) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }
}

/// Immutable description of a monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorDefinition {
    pub name: String,
    pub probe: PluginSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<PluginSpec>,
    pub actions: Vec<PluginSpec>,

    /// Seconds between probe starts
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Seconds a single probe may take
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
}

/// Upper bound for `interval` and `timeout`, one year in seconds
pub const MAX_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

fn default_interval() -> u64 {
    60
}

fn default_timeout() -> u64 {
    30
}

impl MonitorDefinition {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Checks everything that can be checked without constructing plugins
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let invalid = |reason: &str| DefinitionError::Invalid {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.interval == 0 {
            return Err(invalid("interval must be positive"));
        }
        if self.timeout == 0 {
            return Err(invalid("timeout must be positive"));
        }
        if self.interval > MAX_PERIOD_SECS || self.timeout > MAX_PERIOD_SECS {
            return Err(invalid("interval and timeout must not exceed one year"));
        }
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(invalid("min and max must be finite"));
        }
        if self.min > self.max {
            return Err(invalid("min must not exceed max"));
        }
        if self.actions.is_empty() {
            return Err(invalid("at least one action is required"));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DefinitionEntry {
    monitor: MonitorDefinition,
}

/// Parses a definitions document (a YAML sequence of `monitor:` entries)
pub fn parse_definitions(content: &str) -> Result<Vec<MonitorDefinition>, DefinitionError> {
    let entries: Vec<DefinitionEntry> = serde_yaml::from_str(content)?;
    Ok(entries.into_iter().map(|entry| entry.monitor).collect())
}

pub fn read_definitions_file(path: &Path) -> Result<Vec<MonitorDefinition>, DefinitionError> {
    let content = std::fs::read_to_string(path)?;
    parse_definitions(&content).inspect(|defs| {
        trace!("loaded {} definitions from {}", defs.len(), path.display())
    })
}

/// Lists the YAML files of a definitions directory in lexical order
pub fn definition_files(dir: &Path) -> Result<Vec<PathBuf>, DefinitionError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yaml" || ext == "yml");

        if is_yaml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
