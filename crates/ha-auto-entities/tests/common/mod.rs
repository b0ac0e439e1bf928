//! Common test utilities for the auto entities crate

use std::path::Path;
use std::sync::{Arc, Mutex};

use ha_auto_entities::{FilterSpec, Hass, Snapshot};
use ha_core::{ServiceCall, SupportsResponse};

/// Load a fixture file as a string
///
/// Fixtures are stored in the `tests/fixtures/` directory.
pub fn load_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);

    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to load fixture '{}' from {:?}: {}", name, path, e))
}

/// A home with lights, a thermostat, a group and their registry records
pub fn home() -> Arc<Hass> {
    let snapshot = Snapshot::from_json_str(&load_fixture("home.json"))
        .unwrap_or_else(|e| panic!("Failed to parse home fixture: {}", e));
    Arc::new(Hass::from_snapshot(snapshot))
}

/// Filter specifications from a JSON array
pub fn specs(value: serde_json::Value) -> Vec<FilterSpec> {
    serde_json::from_value(value).expect("Invalid filter specifications")
}

/// Entity ids of a selection, in order
pub fn ids(states: Vec<ha_core::State>) -> Vec<String> {
    states
        .into_iter()
        .map(|s| s.entity_id.to_string())
        .collect()
}

/// Register a service that records every call it receives
#[allow(dead_code)]
pub fn capture_service(hass: &Hass, domain: &str, service: &str) -> Arc<Mutex<Vec<ServiceCall>>> {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);
    hass.services.register(
        domain,
        service,
        move |call: ServiceCall| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(call);
                Ok(None)
            }
        },
        None,
        SupportsResponse::None,
    );
    captured
}
