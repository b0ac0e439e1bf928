//! Entity Registry
//!
//! Registry metadata for entities: which integration provides them, which
//! device and area they belong to, and their category.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Entity category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    /// Configuration entity
    Config,
    /// Diagnostic entity
    Diagnostic,
}

impl EntityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::Config => "config",
            EntityCategory::Diagnostic => "diagnostic",
        }
    }
}

/// A registered entity entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityEntry {
    /// Internal ULID
    #[serde(default = "new_entry_id")]
    pub id: String,
    /// Full entity ID (domain.object_id)
    pub entity_id: String,

    /// Component/platform that provides this entity
    pub platform: String,

    /// Parent device ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Directly assigned area, overriding the device's area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
    /// Config entry that created this entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_entry_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_category: Option<EntityCategory>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn new_entry_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

impl EntityEntry {
    /// Create a new entity entry with only the required fields set
    pub fn new(entity_id: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            id: new_entry_id(),
            entity_id: entity_id.into(),
            platform: platform.into(),
            device_id: None,
            area_id: None,
            config_entry_id: None,
            entity_category: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_area(mut self, area_id: impl Into<String>) -> Self {
        self.area_id = Some(area_id.into());
        self
    }

    pub fn with_config_entry(mut self, config_entry_id: impl Into<String>) -> Self {
        self.config_entry_id = Some(config_entry_id.into());
        self
    }

    pub fn with_category(mut self, category: EntityCategory) -> Self {
        self.entity_category = Some(category);
        self
    }
}

/// Entity Registry
///
/// Entries are stored as `Arc<EntityEntry>` to avoid cloning on reads.
#[derive(Default)]
pub struct EntityRegistry {
    /// entity_id -> EntityEntry
    by_entity_id: DashMap<String, Arc<EntityEntry>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `entry.entity_id`
    pub fn register(&self, entry: EntityEntry) -> Arc<EntityEntry> {
        let entry = Arc::new(entry);
        self.by_entity_id
            .insert(entry.entity_id.clone(), Arc::clone(&entry));
        debug!(entity_id = %entry.entity_id, platform = %entry.platform, "Registered entity");
        entry
    }

    /// Get entity by entity_id
    pub fn get(&self, entity_id: &str) -> Option<Arc<EntityEntry>> {
        self.by_entity_id
            .get(entity_id)
            .map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.by_entity_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_entity_id.is_empty()
    }
}
