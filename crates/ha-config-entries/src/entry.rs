//! Config Entry types
//!
//! A ConfigEntry represents a single instance of an integration's configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered JSON mapping used for entry data and options
pub type EntryMap = serde_json::Map<String, serde_json::Value>;

/// A configuration entry for an integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Unique identifier (ULID)
    #[serde(default = "new_entry_id")]
    pub entry_id: String,

    /// Integration domain (e.g., "group", "hue")
    pub domain: String,

    /// Human-readable display name
    #[serde(default)]
    pub title: String,

    /// Immutable configuration data
    #[serde(default)]
    pub data: EntryMap,

    /// User-configurable options
    #[serde(default)]
    pub options: EntryMap,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

fn new_entry_id() -> String {
    ulid::Ulid::new().to_string()
}

impl ConfigEntry {
    /// Create a new config entry
    pub fn new(domain: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            entry_id: new_entry_id(),
            domain: domain.into(),
            title: title.into(),
            data: EntryMap::new(),
            options: EntryMap::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_options(mut self, options: EntryMap) -> Self {
        self.options = options;
        self
    }
}

/// Update data for a config entry
#[derive(Debug, Default)]
pub struct ConfigEntryUpdate {
    pub title: Option<String>,
    pub data: Option<EntryMap>,
    pub options: Option<EntryMap>,
}

impl ConfigEntryUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn options(mut self, options: EntryMap) -> Self {
        self.options = Some(options);
        self
    }
}
