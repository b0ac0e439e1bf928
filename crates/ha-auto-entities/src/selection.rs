//! Entity selection from include and exclude filters

use ha_core::State;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::filters::{Filter, FilterSpec};
use crate::relations::HassLookup;

/// Find the entities matched by `includes` and not by any of `excludes`
///
/// Each include appends its matches in pool order, so an entity matched by
/// two includes appears twice. Excludes then remove every copy they match.
pub fn find_entities(
    lookup: &dyn HassLookup,
    includes: &[FilterSpec],
    excludes: &[FilterSpec],
) -> Vec<State> {
    let pool = lookup.all_states();
    let mut selected = Vec::new();

    for include in includes {
        let filter = Filter::compile(include);
        selected.extend(pool.iter().filter(|s| filter.matches(lookup, s)).cloned());
    }

    for exclude in excludes {
        let filter = Filter::compile(exclude);
        selected.retain(|s| !filter.matches(lookup, s));
    }

    debug!(
        pool = pool.len(),
        includes = includes.len(),
        excludes = excludes.len(),
        selected = selected.len(),
        "Selected entities"
    );
    selected
}

/// Like [`find_entities`], keeping only the first copy of each entity
pub fn find_unique_entities(
    lookup: &dyn HassLookup,
    includes: &[FilterSpec],
    excludes: &[FilterSpec],
) -> Vec<State> {
    let mut seen = std::collections::HashSet::new();
    find_entities(lookup, includes, excludes)
        .into_iter()
        .filter(|s| seen.insert(s.entity_id.clone()))
        .collect()
}

/// How repeated matches are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// One copy per matching include
    #[default]
    KeepDuplicates,
    Unique,
}

/// A reusable set of include and exclude specifications
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub includes: Vec<FilterSpec>,
    #[serde(default)]
    pub excludes: Vec<FilterSpec>,
    #[serde(default)]
    pub mode: SelectionMode,
}

impl Selection {
    pub fn new(includes: Vec<FilterSpec>, excludes: Vec<FilterSpec>) -> Self {
        Self {
            includes,
            excludes,
            mode: SelectionMode::default(),
        }
    }

    /// Report each entity once
    pub fn unique(mut self) -> Self {
        self.mode = SelectionMode::Unique;
        self
    }

    pub fn find(&self, lookup: &dyn HassLookup) -> Vec<State> {
        match self.mode {
            SelectionMode::KeepDuplicates => find_entities(lookup, &self.includes, &self.excludes),
            SelectionMode::Unique => find_unique_entities(lookup, &self.includes, &self.excludes),
        }
    }

    /// Entity ids of [`Selection::find`]
    pub fn entity_ids(&self, lookup: &dyn HassLookup) -> Vec<String> {
        self.find(lookup)
            .into_iter()
            .map(|s| s.entity_id.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hass;
    use ha_core::Context;
    use serde_json::{json, Value};

    fn specs(value: Value) -> Vec<FilterSpec> {
        serde_json::from_value(value).unwrap()
    }

    fn hass() -> Hass {
        let hass = Hass::new();
        for (entity_id, state) in [
            ("light.kitchen", "on"),
            ("switch.fan", "off"),
            ("light.bedroom", "off"),
            ("light.desk", "on"),
        ] {
            hass.states.set(
                entity_id.parse().unwrap(),
                state,
                Default::default(),
                Context::new(),
            );
        }
        hass
    }

    fn ids(states: Vec<State>) -> Vec<String> {
        states.into_iter().map(|s| s.entity_id.to_string()).collect()
    }

    #[test]
    fn test_no_includes_selects_nothing() {
        let hass = hass();
        assert!(find_entities(&hass, &[], &specs(json!([{"state": "off"}]))).is_empty());
    }

    #[test]
    fn test_include_then_exclude_in_pool_order() {
        let hass = hass();
        let found = find_entities(
            &hass,
            &specs(json!([{"domain": "light"}])),
            &specs(json!([{"state": "off"}])),
        );
        assert_eq!(ids(found), vec!["light.kitchen", "light.desk"]);
    }

    #[test]
    fn test_overlapping_includes_keep_duplicates() {
        let hass = hass();
        let includes = specs(json!([{"state": "on"}, {"domain": "light"}]));
        assert_eq!(
            ids(find_entities(&hass, &includes, &[])),
            vec![
                "light.kitchen",
                "light.desk",
                "light.kitchen",
                "light.bedroom",
                "light.desk"
            ]
        );
        assert_eq!(
            ids(find_unique_entities(&hass, &includes, &[])),
            vec!["light.kitchen", "light.desk", "light.bedroom"]
        );
    }

    #[test]
    fn test_exclude_removes_every_copy() {
        let hass = hass();
        let found = find_entities(
            &hass,
            &specs(json!([{"domain": "light"}, {"entity_id": "light.desk"}])),
            &specs(json!([{"entity_id": "light.desk"}])),
        );
        assert_eq!(ids(found), vec!["light.kitchen", "light.bedroom"]);
    }

    #[test]
    fn test_empty_include_matches_all() {
        let hass = hass();
        assert_eq!(find_entities(&hass, &specs(json!([{}])), &[]).len(), 4);
    }

    #[test]
    fn test_selection_modes() {
        let hass = hass();
        let selection = Selection::new(specs(json!([{"domain": "light"}, {"state": "on"}])), vec![]);
        assert_eq!(selection.entity_ids(&hass).len(), 5);

        let selection = selection.unique();
        assert_eq!(
            selection.entity_ids(&hass),
            vec!["light.kitchen", "light.bedroom", "light.desk"]
        );
    }

    #[test]
    fn test_selection_deserialize() {
        let selection: Selection = serde_json::from_value(json!({
            "includes": [{"domain": "light"}],
            "mode": "unique"
        }))
        .unwrap();
        assert_eq!(selection.mode, SelectionMode::Unique);
        assert!(selection.excludes.is_empty());
    }
}
