//! Config Entries
//!
//! Configuration entries represent individual integration instances. This
//! crate keeps them in memory and lets services rewrite their options.
//!
//! # Key Types
//!
//! - [`ConfigEntry`] - A single integration configuration
//! - [`ConfigEntries`] - Manager for all config entries

pub mod entry;
pub mod manager;

pub use entry::{ConfigEntry, ConfigEntryUpdate, EntryMap};
pub use manager::{ConfigEntries, ConfigEntriesError, ConfigEntriesResult};
