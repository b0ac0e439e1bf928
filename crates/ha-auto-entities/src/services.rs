//! `call_auto_entities` services
//!
//! - `with_array` calls another service with the selected entity ids placed
//!   under `array_key` of its data.
//! - `update_group` rewrites the members of a UI-configured group.

use std::sync::{Arc, Weak};

use ha_config_entries::{ConfigEntry, ConfigEntryUpdate};
use ha_core::{split_service_id, ServiceCall, SupportsResponse};
use ha_service_registry::{ServiceError, ServiceResult};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::config::{UpdateGroupData, WithArrayData};
use crate::hass::Hass;
use crate::selection::Selection;

pub const DOMAIN: &str = "call_auto_entities";
pub const SERVICE_WITH_ARRAY: &str = "with_array";
pub const SERVICE_UPDATE_GROUP: &str = "update_group";

/// Config entry title of the integration
pub const TITLE: &str = "Call Auto Entities";

/// Domain a config entry must have for `update_group`
pub const GROUP_DOMAIN: &str = "group";

/// Option of a group config entry holding its members
pub const GROUP_MEMBERS_OPTION: &str = "entities";

fn filter_list_schema() -> Value {
    json!({"type": "array", "items": {"type": "object"}})
}

fn with_array_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "service": {"type": "string"},
            "data": {"type": "object"},
            "array_key": {"type": "string"},
            "includes": filter_list_schema(),
            "excludes": filter_list_schema()
        },
        "required": ["service"]
    })
}

fn update_group_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "entity_id": {"type": "string"},
            "includes": filter_list_schema(),
            "excludes": filter_list_schema()
        },
        "required": ["entity_id"]
    })
}

/// Register the services of this integration
///
/// Handlers hold a weak reference, so they fail instead of keeping `hass`
/// alive once it is dropped.
pub fn setup(hass: &Arc<Hass>) {
    {
        let weak = Arc::downgrade(hass);
        hass.services.register(
            DOMAIN,
            SERVICE_WITH_ARRAY,
            move |call| {
                let weak = Weak::clone(&weak);
                async move { with_array(&*upgrade(&weak)?, call).await }
            },
            Some(with_array_schema()),
            SupportsResponse::None,
        );
    }

    {
        let weak = Arc::downgrade(hass);
        hass.services.register(
            DOMAIN,
            SERVICE_UPDATE_GROUP,
            move |call| {
                let weak = Weak::clone(&weak);
                async move { update_group(&*upgrade(&weak)?, call) }
            },
            Some(update_group_schema()),
            SupportsResponse::None,
        );
    }

    info!("Call auto entities services registered");
}

fn upgrade(weak: &Weak<Hass>) -> Result<Arc<Hass>, ServiceError> {
    weak.upgrade()
        .ok_or_else(|| ServiceError::CallFailed("instance is shut down".to_string()))
}

fn parse<T: DeserializeOwned>(call: &ServiceCall) -> Result<T, ServiceError> {
    call.data()
        .map_err(|e| ServiceError::InvalidData(e.to_string()))
}

/// Log a failed precondition and turn it into an error
fn rejected(message: String) -> ServiceError {
    error!("{}", message);
    ServiceError::InvalidData(message)
}

/// Call `service` with the selected entity ids
pub async fn with_array(hass: &Hass, call: ServiceCall) -> ServiceResult {
    let WithArrayData {
        service,
        mut data,
        array_key,
        includes,
        excludes,
    } = parse(&call)?;

    let Some((domain, name)) = split_service_id(&service) else {
        return Err(rejected(format!(
            "Service '{}' is not of the form domain.service",
            service
        )));
    };

    let ids = Selection::new(includes, excludes).entity_ids(hass);
    data.insert(array_key, json!(ids));

    let data = Value::Object(data);
    info!("Calling {} {} with {}", domain, name, data);

    hass.services
        .call(domain, name, data, call.context.child(), false)
        .await
}

/// Replace the members of a group config entry with the selected entity ids
pub fn update_group(hass: &Hass, call: ServiceCall) -> ServiceResult {
    let request: UpdateGroupData = parse(&call)?;
    let group_entity_id = &request.entity_id;

    let entity = hass
        .registries
        .entities
        .get(group_entity_id)
        .ok_or_else(|| rejected(format!("No group entity found with name '{}'", group_entity_id)))?;

    let config_entry_id = entity.config_entry_id.as_deref().ok_or_else(|| {
        rejected(format!(
            "No config entry associated with '{}'",
            group_entity_id
        ))
    })?;

    let config_entry = hass
        .config_entries
        .get(config_entry_id)
        .ok_or_else(|| rejected(format!("Config entry for '{}' not found", group_entity_id)))?;

    if config_entry.domain != GROUP_DOMAIN {
        return Err(rejected(format!("'{}' is not a group", group_entity_id)));
    }

    let members = request.selection().entity_ids(hass);
    let mut options = config_entry.options.clone();
    options.insert(GROUP_MEMBERS_OPTION.to_string(), json!(members));

    hass.config_entries
        .update(config_entry_id, ConfigEntryUpdate::new().options(options))
        .map_err(|e| ServiceError::CallFailed(e.to_string()))?;

    info!("'{}' updated with members: {:?}", group_entity_id, members);
    Ok(None)
}

/// Create the integration's config entry
///
/// Only one instance is allowed; `None` when it already exists.
pub fn create_config_entry(hass: &Hass) -> Option<ConfigEntry> {
    if !hass.config_entries.get_by_domain(DOMAIN).is_empty() {
        warn!("{} is already configured, single instance allowed", DOMAIN);
        return None;
    }
    Some(hass.config_entries.add(ConfigEntry::new(DOMAIN, TITLE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ha_core::Context;
    use ha_registries::EntityEntry;
    use std::sync::Mutex;

    fn hass() -> Arc<Hass> {
        let hass = Arc::new(Hass::new());
        for (entity_id, state) in [("light.a", "on"), ("light.b", "off"), ("switch.c", "on")] {
            hass.states.set(
                entity_id.parse().unwrap(),
                state,
                Default::default(),
                Context::new(),
            );
        }
        setup(&hass);
        hass
    }

    /// Register `domain.service` and record the data of every call
    fn recorder(hass: &Hass, domain: &str, service: &str) -> Arc<Mutex<Vec<Value>>> {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&calls);
        hass.services.register(
            domain,
            service,
            move |call: ServiceCall| {
                let recorded = Arc::clone(&recorded);
                async move {
                    recorded.lock().unwrap().push(call.service_data);
                    Ok(None)
                }
            },
            None,
            SupportsResponse::None,
        );
        calls
    }

    async fn call(hass: &Hass, service: &str, data: Value) -> ServiceResult {
        hass.services
            .call(DOMAIN, service, data, Context::new(), false)
            .await
    }

    #[test]
    fn test_setup_registers_services() {
        let hass = hass();
        assert!(hass.services.has_service(DOMAIN, SERVICE_WITH_ARRAY));
        assert!(hass.services.has_service(DOMAIN, SERVICE_UPDATE_GROUP));
        assert_eq!(hass.services.domain_services(DOMAIN).len(), 2);
    }

    #[tokio::test]
    async fn test_with_array_default_key() {
        let hass = hass();
        let calls = recorder(&hass, "light", "turn_off");

        call(
            &hass,
            SERVICE_WITH_ARRAY,
            json!({
                "service": "light.turn_off",
                "data": {"transition": 2},
                "includes": [{"domain": "light"}],
                "excludes": [{"state": "off"}]
            }),
        )
        .await
        .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(*calls, vec![json!({"transition": 2, "entity_id": ["light.a"]})]);
    }

    #[tokio::test]
    async fn test_with_array_custom_key() {
        let hass = hass();
        let calls = recorder(&hass, "notify", "send");

        call(
            &hass,
            SERVICE_WITH_ARRAY,
            json!({
                "service": "notify.send",
                "array_key": "targets",
                "includes": [{"state": "on"}]
            }),
        )
        .await
        .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(*calls, vec![json!({"targets": ["light.a", "switch.c"]})]);
    }

    #[tokio::test]
    async fn test_with_array_invalid_service() {
        let hass = hass();
        let result = call(&hass, SERVICE_WITH_ARRAY, json!({"service": "turn_on"})).await;
        assert!(matches!(result, Err(ServiceError::InvalidData(_))));

        let result = call(&hass, SERVICE_WITH_ARRAY, json!({"includes": []})).await;
        assert!(matches!(result, Err(ServiceError::InvalidData(_))));

        let result = call(&hass, SERVICE_WITH_ARRAY, json!({"service": "light.nope"})).await;
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_group() {
        let hass = hass();
        let entry = hass.config_entries.add(
            ConfigEntry::new(GROUP_DOMAIN, "Lights")
                .with_options(json!({"hide_members": true}).as_object().cloned().unwrap()),
        );
        hass.registries.entities.register(
            EntityEntry::new("light.group", "group").with_config_entry(&entry.entry_id),
        );

        call(
            &hass,
            SERVICE_UPDATE_GROUP,
            json!({"entity_id": "light.group", "includes": [{"domain": "light"}]}),
        )
        .await
        .unwrap();

        let updated = hass.config_entries.get(&entry.entry_id).unwrap();
        assert_eq!(updated.options["entities"], json!(["light.a", "light.b"]));
        assert_eq!(updated.options["hide_members"], json!(true));
    }

    #[tokio::test]
    async fn test_update_group_preconditions() {
        let hass = hass();
        let other = hass.config_entries.add(ConfigEntry::new("template", "Template"));
        hass.registries
            .entities
            .register(EntityEntry::new("sensor.unlinked", "demo"));
        hass.registries.entities.register(
            EntityEntry::new("sensor.dangling", "demo").with_config_entry("missing"),
        );
        hass.registries.entities.register(
            EntityEntry::new("sensor.template", "template").with_config_entry(&other.entry_id),
        );

        for entity_id in [
            "sensor.unknown",
            "sensor.unlinked",
            "sensor.dangling",
            "sensor.template",
        ] {
            let result = call(&hass, SERVICE_UPDATE_GROUP, json!({"entity_id": entity_id})).await;
            assert!(
                matches!(result, Err(ServiceError::InvalidData(_))),
                "{} should be rejected",
                entity_id
            );
        }
        assert!(hass.config_entries.get(&other.entry_id).unwrap().options.is_empty());
    }

    #[test]
    fn test_single_config_entry() {
        let hass = hass();
        let entry = create_config_entry(&hass).unwrap();
        assert_eq!(entry.domain, DOMAIN);
        assert_eq!(entry.title, TITLE);
        assert!(create_config_entry(&hass).is_none());
    }

    #[tokio::test]
    async fn test_handler_after_drop() {
        let hass = hass();
        let services = Arc::clone(&hass.services);
        drop(hass);

        let result = services
            .call(DOMAIN, SERVICE_UPDATE_GROUP, json!({"entity_id": "x.y"}), Context::new(), false)
            .await;
        assert!(matches!(result, Err(ServiceError::CallFailed(_))));
    }
}
