//! The host instance filters and services run against

use std::sync::Arc;

use ha_config_entries::ConfigEntries;
use ha_core::State;
use ha_registries::{AreaEntry, DeviceEntry, EntityEntry, Registries};
use ha_service_registry::ServiceRegistry;
use ha_state_store::StateStore;
use tracing::info;

use crate::config::Snapshot;
use crate::relations::HassLookup;

/// States, registries, services and config entries of one instance
#[derive(Clone, Default)]
pub struct Hass {
    pub states: Arc<StateStore>,
    pub registries: Arc<Registries>,
    pub services: Arc<ServiceRegistry>,
    pub config_entries: Arc<ConfigEntries>,
}

impl Hass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an instance holding everything recorded in `snapshot`
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let hass = Self::new();

        let Snapshot {
            states,
            entities,
            devices,
            areas,
            config_entries,
        } = snapshot;

        for area in areas {
            hass.registries.areas.register(area);
        }
        for device in devices {
            hass.registries.devices.register(device);
        }
        for entity in entities {
            hass.registries.entities.register(entity);
        }
        for entry in config_entries {
            hass.config_entries.add(entry);
        }
        for state in states {
            hass.states.restore(state);
        }

        info!(
            states = hass.states.entity_count(),
            entities = hass.registries.entities.len(),
            devices = hass.registries.devices.len(),
            areas = hass.registries.areas.len(),
            config_entries = hass.config_entries.len(),
            "Loaded snapshot"
        );
        hass
    }
}

impl HassLookup for Hass {
    fn all_states(&self) -> Vec<State> {
        self.states.all()
    }

    fn state(&self, entity_id: &str) -> Option<State> {
        self.states.get(entity_id)
    }

    fn entity_entry(&self, entity_id: &str) -> Option<Arc<EntityEntry>> {
        self.registries.entities.get(entity_id)
    }

    fn device(&self, device_id: &str) -> Option<Arc<DeviceEntry>> {
        self.registries.devices.get(device_id)
    }

    fn area(&self, area_id: &str) -> Option<Arc<AreaEntry>> {
        self.registries.areas.get(area_id)
    }
}
