//! Entity state storage for Home Assistant
//!
//! This crate provides the StateStore, which holds the current state of all
//! entities. States are kept in insertion order so that scans over the whole
//! pool are deterministic.

use ha_core::{Attributes, Context, EntityId, State};
use indexmap::IndexMap;
use std::sync::RwLock;
use tracing::{debug, instrument, trace};

/// The state store tracks all entity states
pub struct StateStore {
    /// All entity states keyed by entity_id string
    ///
    /// Uses IndexMap + RwLock to preserve insertion order
    states: RwLock<IndexMap<String, State>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(IndexMap::new()),
        }
    }

    /// Set the state of an entity
    ///
    /// If the entity already has a state, the `last_changed` timestamp will
    /// only be updated if the state value actually changed. An existing entity
    /// keeps its position in the pool.
    #[instrument(skip(self, state, attributes, context), fields(entity_id = %entity_id))]
    pub fn set(
        &self,
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: Attributes,
        context: Context,
    ) -> State {
        let key = entity_id.to_string();
        let old_state = self.get(&key);

        let new_state = match &old_state {
            Some(existing) => existing.with_update(state, attributes, context),
            None => State::new(entity_id, state, attributes, context),
        };

        debug!(
            state = %new_state.state,
            changed = old_state.as_ref().map(|s| s.state != new_state.state).unwrap_or(true),
            "Setting entity state"
        );

        if let Ok(mut states) = self.states.write() {
            states.insert(key, new_state.clone());
        }

        new_state
    }

    /// Insert a fully formed state as-is, e.g. from a snapshot
    pub fn restore(&self, state: State) {
        trace!(entity_id = %state.entity_id, "Restoring entity state");
        if let Ok(mut states) = self.states.write() {
            states.insert(state.entity_id.to_string(), state);
        }
    }

    /// Get the current state of an entity
    pub fn get(&self, entity_id: &str) -> Option<State> {
        self.states
            .read()
            .ok()
            .and_then(|states| states.get(entity_id).cloned())
    }

    /// Snapshot of all states, in insertion order
    pub fn all(&self) -> Vec<State> {
        self.states
            .read()
            .map(|states| states.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the total number of entities
    pub fn entity_count(&self) -> usize {
        self.states.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
