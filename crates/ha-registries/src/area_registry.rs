//! Area Registry
//!
//! Tracks all registered areas (rooms, zones) in the home.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A registered area entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaEntry {
    pub id: String,

    /// Area name (e.g., "Living Room")
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_name: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl AreaEntry {
    /// Create an area whose id is derived from its name, like `living_room`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: normalize_name(&name).replace(' ', "_"),
            normalized_name: Some(normalize_name(&name)),
            name,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Normalize a name for searching
fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .trim()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ', "")
}

/// Area Registry
#[derive(Default)]
pub struct AreaRegistry {
    /// area_id -> AreaEntry
    by_id: DashMap<String, Arc<AreaEntry>>,
}

impl AreaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an area
    pub fn register(&self, mut entry: AreaEntry) -> Arc<AreaEntry> {
        entry.normalized_name = Some(normalize_name(&entry.name));
        let entry = Arc::new(entry);
        self.by_id.insert(entry.id.clone(), Arc::clone(&entry));
        info!("Registered area: {} ({})", entry.name, entry.id);
        entry
    }

    /// Get area by ID
    pub fn get(&self, area_id: &str) -> Option<Arc<AreaEntry>> {
        self.by_id.get(area_id).map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
