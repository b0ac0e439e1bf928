//! Home Assistant Registries
//!
//! In-memory registries for:
//! - Entities (EntityRegistry)
//! - Devices (DeviceRegistry)
//! - Areas (AreaRegistry)
//!
//! Lookups are lock-free reads over `DashMap`s and hand out
//! `Arc` entries, so callers can hold them across further queries.

pub mod area_registry;
pub mod device_registry;
pub mod entity_registry;

pub use area_registry::{AreaEntry, AreaRegistry};
pub use device_registry::{DeviceEntry, DeviceRegistry};
pub use entity_registry::{EntityCategory, EntityEntry, EntityRegistry};

/// All registries bundled together
#[derive(Default)]
pub struct Registries {
    pub entities: EntityRegistry,
    pub devices: DeviceRegistry,
    pub areas: AreaRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registries_bundle() {
        let registries = Registries::new();

        let area = registries.areas.register(AreaEntry::new("Living Room"));
        let device = registries
            .devices
            .register(DeviceEntry::new(Some("Hue Bridge")).with_area(&area.id));
        registries
            .entities
            .register(EntityEntry::new("light.living_room", "hue").with_device(&device.id));

        let entry = registries.entities.get("light.living_room").unwrap();
        let device = registries.devices.get(entry.device_id.as_deref().unwrap()).unwrap();
        let area = registries.areas.get(device.area_id.as_deref().unwrap()).unwrap();
        assert_eq!(area.name, "Living Room");
    }
}
