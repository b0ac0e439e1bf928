//! Selection files, service payloads and state snapshots

use std::fs;
use std::path::{Path, PathBuf};

use ha_config_entries::ConfigEntry;
use ha_core::State;
use ha_registries::{AreaEntry, DeviceEntry, EntityEntry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::filters::FilterSpec;
use crate::selection::{Selection, SelectionMode};

/// Result type for loading configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading selections and snapshots
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Includes, excludes and mode as written in a selection file
///
/// ```yaml
/// includes:
///   - domain: light
///   - or:
///       - area: Kitchen
///       - device: "/Hue/"
/// excludes:
///   - state: unavailable
/// mode: unique
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    #[serde(default)]
    pub includes: Vec<FilterSpec>,
    #[serde(default)]
    pub excludes: Vec<FilterSpec>,
    #[serde(default)]
    pub mode: SelectionMode,
}

impl SelectionConfig {
    /// Parse a YAML document
    ///
    /// The YAML is converted to JSON values first, so patterns are matched
    /// exactly as if the selection had been written in JSON.
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
        if yaml.is_null() {
            return Ok(Self::default());
        }
        let json = serde_json::to_value(yaml).map_err(|e| invalid("selection", e))?;
        check_specs(&json, "includes")?;
        check_specs(&json, "excludes")?;
        serde_json::from_value(json).map_err(|e| invalid("selection", e))
    }

    pub fn selection(&self) -> Selection {
        Selection {
            includes: self.includes.clone(),
            excludes: self.excludes.clone(),
            mode: self.mode,
        }
    }
}

fn invalid(key: impl Into<String>, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        reason: reason.to_string(),
    }
}

/// Reject entries of `key` that are not filter mappings
fn check_specs(document: &Value, key: &str) -> ConfigResult<()> {
    match document.get(key) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(items)) => {
            match items.iter().position(|item| !item.is_object()) {
                Some(index) => Err(invalid(
                    format!("{}[{}]", key, index),
                    "expected a filter mapping",
                )),
                None => Ok(()),
            }
        }
        Some(_) => Err(invalid(key, "expected a list of filter mappings")),
    }
}

/// Load a selection from a YAML file
pub fn load_selection(path: impl AsRef<Path>) -> ConfigResult<SelectionConfig> {
    let path = path.as_ref();
    debug!("Loading selection file: {:?}", path);
    SelectionConfig::from_yaml_str(&read(path)?)
}

fn read(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

fn default_array_key() -> String {
    ha_core::ATTR_ENTITY_ID.to_string()
}

/// Data of the `with_array` service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithArrayData {
    /// Target service as `domain.service`
    pub service: String,
    /// Data passed through to the target service
    #[serde(default)]
    pub data: serde_json::Map<String, Value>,
    /// Key of `data` that receives the selected entity ids
    #[serde(default = "default_array_key")]
    pub array_key: String,
    #[serde(default)]
    pub includes: Vec<FilterSpec>,
    #[serde(default)]
    pub excludes: Vec<FilterSpec>,
}

impl WithArrayData {
    pub fn selection(&self) -> Selection {
        Selection::new(self.includes.clone(), self.excludes.clone())
    }
}

/// Data of the `update_group` service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateGroupData {
    /// The group entity to rewrite
    pub entity_id: String,
    #[serde(default)]
    pub includes: Vec<FilterSpec>,
    #[serde(default)]
    pub excludes: Vec<FilterSpec>,
}

impl UpdateGroupData {
    pub fn selection(&self) -> Selection {
        Selection::new(self.includes.clone(), self.excludes.clone())
    }
}

/// States and registry contents captured from a running instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub states: Vec<State>,
    #[serde(default)]
    pub entities: Vec<EntityEntry>,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
    #[serde(default)]
    pub areas: Vec<AreaEntry>,
    #[serde(default)]
    pub config_entries: Vec<ConfigEntry>,
}

impl Snapshot {
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Load a snapshot from a JSON file
pub fn load_snapshot(path: impl AsRef<Path>) -> ConfigResult<Snapshot> {
    let path = path.as_ref();
    debug!("Loading snapshot file: {:?}", path);
    Snapshot::from_json_str(&read(path)?)
}
