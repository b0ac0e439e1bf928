//! Lookups from an entity to its registry record, device and area

use std::sync::Arc;

use ha_core::State;
use ha_registries::{AreaEntry, DeviceEntry, EntityEntry};

/// Read access to the states and registries a filter may consult
pub trait HassLookup {
    /// Every current state, in insertion order
    fn all_states(&self) -> Vec<State>;

    fn state(&self, entity_id: &str) -> Option<State>;

    fn entity_entry(&self, entity_id: &str) -> Option<Arc<EntityEntry>>;

    fn device(&self, device_id: &str) -> Option<Arc<DeviceEntry>>;

    fn area(&self, area_id: &str) -> Option<Arc<AreaEntry>>;
}

/// Registry record of the entity behind `state`
pub fn entity_entry_for(lookup: &dyn HassLookup, state: &State) -> Option<Arc<EntityEntry>> {
    lookup.entity_entry(&state.entity_id.to_string())
}

/// Device owning the entity, if its record names one that exists
pub fn device_for(lookup: &dyn HassLookup, state: &State) -> Option<Arc<DeviceEntry>> {
    let entry = entity_entry_for(lookup, state)?;
    lookup.device(entry.device_id.as_deref()?)
}

/// Area of the entity
///
/// The record's own area wins; otherwise the owning device's area is used.
/// An entity without a registry record has no area.
pub fn area_for(lookup: &dyn HassLookup, state: &State) -> Option<Arc<AreaEntry>> {
    let entry = entity_entry_for(lookup, state)?;
    if let Some(area) = entry.area_id.as_deref().and_then(|id| lookup.area(id)) {
        return Some(area);
    }
    let device = lookup.device(entry.device_id.as_deref()?)?;
    lookup.area(device.area_id.as_deref()?)
}
