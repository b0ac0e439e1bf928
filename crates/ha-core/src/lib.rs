//! Core types for Home Assistant
//!
//! The small set of value types shared by every other crate in the
//! workspace: [`EntityId`], [`State`], [`Context`] and [`ServiceCall`].

mod context;
mod entity_id;
mod service_call;
mod state;

pub use context::Context;
pub use entity_id::{EntityId, EntityIdError};
pub use service_call::{split_service_id, ServiceCall, SupportsResponse};
pub use state::{Attributes, State};

/// Attribute holding an entity's display name
pub const ATTR_FRIENDLY_NAME: &str = "friendly_name";

/// Attribute holding the member list of a group entity
pub const ATTR_ENTITY_ID: &str = "entity_id";
