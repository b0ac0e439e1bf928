//! Rule-based entity selection
//!
//! Users describe sets of entities with filter specifications (by domain,
//! state, attributes, device, area, group membership and more) instead of
//! listing entity ids by hand. [`find_entities`] evaluates include and
//! exclude specifications against a [`HassLookup`], and the services in
//! [`services`] feed the result into other service calls or group options.
//!
//! ```
//! use ha_auto_entities::{find_entities, FilterSpec, Hass};
//! use serde_json::json;
//!
//! let hass = Hass::new();
//! hass.states.set(
//!     "light.desk".parse().unwrap(),
//!     "on",
//!     Default::default(),
//!     Default::default(),
//! );
//!
//! let includes: Vec<FilterSpec> = serde_json::from_value(json!([{"domain": "light"}])).unwrap();
//! let found = find_entities(&hass, &includes, &[]);
//! assert_eq!(found[0].entity_id.to_string(), "light.desk");
//! ```

pub mod attributes;
pub mod config;
pub mod filters;
pub mod hass;
pub mod matcher;
pub mod relations;
pub mod selection;
pub mod services;

pub use config::{
    load_selection, load_snapshot, ConfigError, ConfigResult, SelectionConfig, Snapshot,
    UpdateGroupData, WithArrayData,
};
pub use filters::{compile_filter, Filter, FilterKind, FilterSpec, UnknownFilter};
pub use hass::Hass;
pub use matcher::{matches, Pattern};
pub use relations::HassLookup;
pub use selection::{find_entities, find_unique_entities, Selection, SelectionMode};
