//! Filter specifications and compiled filters
//!
//! A filter specification is a JSON object mapping filter names to patterns,
//! for example `{"domain": "light", "area": "Kitchen"}`. Every key must hold
//! for an entity to match. `not` takes a nested specification and `or` a list
//! of them.
//!
//! Malformed specifications never fail compilation: the offending filter is
//! logged and either dropped (unknown name) or compiled to [`Filter::Never`].

use std::fmt;
use std::str::FromStr;

use ha_core::{State, ATTR_ENTITY_ID};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, trace};

use crate::attributes::{parse_attribute_key, resolve};
use crate::matcher::Pattern;
use crate::relations::{area_for, device_for, entity_entry_for, HassLookup};

/// A filter specification as written by the user
pub type FilterSpec = serde_json::Map<String, Value>;

/// Filter name that is not one of [`FilterKind`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No filter with name '{0}' available")]
pub struct UnknownFilter(pub String);

/// Names accepted as keys of a filter specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Domain,
    EntityId,
    State,
    Name,
    Group,
    Attributes,
    Device,
    DeviceManufacturer,
    DeviceModel,
    Area,
    EntityCategory,
    Integration,
    Not,
    Or,
}

impl FilterKind {
    pub const ALL: [FilterKind; 14] = [
        FilterKind::Domain,
        FilterKind::EntityId,
        FilterKind::State,
        FilterKind::Name,
        FilterKind::Group,
        FilterKind::Attributes,
        FilterKind::Device,
        FilterKind::DeviceManufacturer,
        FilterKind::DeviceModel,
        FilterKind::Area,
        FilterKind::EntityCategory,
        FilterKind::Integration,
        FilterKind::Not,
        FilterKind::Or,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Domain => "domain",
            FilterKind::EntityId => "entity_id",
            FilterKind::State => "state",
            FilterKind::Name => "name",
            FilterKind::Group => "group",
            FilterKind::Attributes => "attributes",
            FilterKind::Device => "device",
            FilterKind::DeviceManufacturer => "device_manufacturer",
            FilterKind::DeviceModel => "device_model",
            FilterKind::Area => "area",
            FilterKind::EntityCategory => "entity_category",
            FilterKind::Integration => "integration",
            FilterKind::Not => "not",
            FilterKind::Or => "or",
        }
    }

    /// Compile the filter of this kind for `pattern`
    ///
    /// A pattern of the wrong shape is logged and yields [`Filter::Never`].
    pub fn build(self, pattern: &Value) -> Filter {
        let leaf = || Pattern::new(pattern.clone());
        match self {
            FilterKind::Domain => Filter::Domain(leaf()),
            FilterKind::EntityId => Filter::EntityId(leaf()),
            FilterKind::State => Filter::State(leaf()),
            FilterKind::Name => Filter::Name(leaf()),
            FilterKind::Device => Filter::Device(leaf()),
            FilterKind::DeviceManufacturer => Filter::DeviceManufacturer(leaf()),
            FilterKind::DeviceModel => Filter::DeviceModel(leaf()),
            FilterKind::Area => Filter::Area(leaf()),
            FilterKind::EntityCategory => Filter::EntityCategory(leaf()),
            FilterKind::Integration => Filter::Integration(leaf()),
            FilterKind::Group => match pattern {
                Value::String(group_id) => Filter::Group(group_id.clone()),
                other => malformed(self, "a group entity id", other),
            },
            FilterKind::Attributes => match pattern {
                Value::Object(map) => Filter::Attributes(
                    map.iter()
                        .map(|(key, value)| AttributeMatch {
                            path: parse_attribute_key(key),
                            pattern: Pattern::new(value.clone()),
                        })
                        .collect(),
                ),
                other => malformed(self, "a mapping of attributes", other),
            },
            FilterKind::Not => match pattern {
                Value::Object(spec) => Filter::Not(Box::new(Filter::compile(spec))),
                other => malformed(self, "a filter mapping", other),
            },
            FilterKind::Or => match pattern {
                Value::Array(items) => Filter::Any(
                    items
                        .iter()
                        .filter_map(|item| match item {
                            Value::Object(spec) => Some(Filter::compile(spec)),
                            other => {
                                error!(
                                    entry = %other,
                                    "Skipping 'or' entry that is not a filter mapping"
                                );
                                None
                            }
                        })
                        .collect(),
                ),
                other => malformed(self, "a list of filter mappings", other),
            },
        }
    }
}

fn malformed(kind: FilterKind, expected: &str, got: &Value) -> Filter {
    error!(
        filter = kind.as_str(),
        pattern = %got,
        "Filter expects {}, it will never match",
        expected
    );
    Filter::Never
}

impl FromStr for FilterKind {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownFilter(s.to_string()))
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `path: pattern` pair of an `attributes` filter
#[derive(Debug, Clone)]
pub struct AttributeMatch {
    pub path: Vec<String>,
    pub pattern: Pattern,
}

/// A compiled filter
#[derive(Debug, Clone)]
pub enum Filter {
    /// Every filter must match; empty matches everything
    All(Vec<Filter>),
    /// At least one filter must match
    Any(Vec<Filter>),
    Not(Box<Filter>),
    /// Placeholder for a malformed filter
    Never,
    Domain(Pattern),
    EntityId(Pattern),
    State(Pattern),
    /// Matched against `friendly_name`
    Name(Pattern),
    /// Membership in the `entity_id` list of a group entity
    Group(String),
    Attributes(Vec<AttributeMatch>),
    /// Matched against the user-set name, then the integration name
    Device(Pattern),
    DeviceManufacturer(Pattern),
    DeviceModel(Pattern),
    /// Matched against the area name, then the area id
    Area(Pattern),
    EntityCategory(Pattern),
    /// Matched against the registry platform
    Integration(Pattern),
}

impl Filter {
    /// Compile a specification; the result is the AND of all its keys
    pub fn compile(spec: &FilterSpec) -> Filter {
        let filters = spec
            .iter()
            .filter_map(|(name, pattern)| match name.parse::<FilterKind>() {
                Ok(kind) => {
                    trace!(filter = %kind, pattern = %pattern, "Compiling filter");
                    Some(kind.build(pattern))
                }
                Err(e) => {
                    error!("{}", e);
                    None
                }
            })
            .collect();
        Filter::All(filters)
    }

    /// Whether `state` passes this filter
    pub fn matches(&self, lookup: &dyn HassLookup, state: &State) -> bool {
        match self {
            Filter::All(filters) => filters.iter().all(|f| f.matches(lookup, state)),
            Filter::Any(filters) => filters.iter().any(|f| f.matches(lookup, state)),
            Filter::Not(inner) => !inner.matches(lookup, state),
            Filter::Never => false,
            Filter::Domain(pattern) => pattern.matches(&Value::from(state.domain())),
            Filter::EntityId(pattern) => {
                pattern.matches(&Value::String(state.entity_id.to_string()))
            }
            Filter::State(pattern) => pattern.matches(&Value::from(state.state.as_str())),
            Filter::Name(pattern) => pattern.matches(&state.friendly_name()),
            Filter::Group(group_id) => is_group_member(lookup, group_id, state),
            Filter::Attributes(matches) => matches.iter().all(|m| {
                resolve(&m.path, &state.attributes).is_some_and(|value| m.pattern.matches(value))
            }),
            Filter::Device(pattern) => device_for(lookup, state).is_some_and(|device| {
                pattern.matches(&optional(device.name_by_user.as_deref()))
                    || pattern.matches(&optional(device.name.as_deref()))
            }),
            Filter::DeviceManufacturer(pattern) => device_for(lookup, state)
                .is_some_and(|device| pattern.matches(&optional(device.manufacturer.as_deref()))),
            Filter::DeviceModel(pattern) => device_for(lookup, state)
                .is_some_and(|device| pattern.matches(&optional(device.model.as_deref()))),
            Filter::Area(pattern) => area_for(lookup, state).is_some_and(|area| {
                pattern.matches(&Value::from(area.name.as_str()))
                    || pattern.matches(&Value::from(area.id.as_str()))
            }),
            Filter::EntityCategory(pattern) => {
                entity_entry_for(lookup, state).is_some_and(|entry| {
                    let category = entry.entity_category.map(|c| c.as_str());
                    pattern.matches(&optional(category))
                })
            }
            Filter::Integration(pattern) => entity_entry_for(lookup, state)
                .is_some_and(|entry| pattern.matches(&Value::from(entry.platform.as_str()))),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All(Vec::new())
    }
}

/// Compile a filter specification
pub fn compile_filter(spec: &FilterSpec) -> Filter {
    Filter::compile(spec)
}

fn optional(value: Option<&str>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn is_group_member(lookup: &dyn HassLookup, group_id: &str, state: &State) -> bool {
    let Some(group) = lookup.state(group_id) else {
        return false;
    };
    let entity_id = state.entity_id.to_string();
    match group.attribute(ATTR_ENTITY_ID) {
        Some(Value::Array(members)) => members.iter().any(|m| m.as_str() == Some(&entity_id)),
        _ => false,
    }
}
