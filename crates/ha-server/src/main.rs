//! Auto entities command line
//!
//! Loads a JSON snapshot of states and registries, evaluates a YAML
//! selection file against it and prints the matching entity ids, one per
//! line.
//!
//! ```text
//! auto-entities [--unique] <SNAPSHOT> <SELECTION>
//! ```
//!
//! Logging goes to stderr and is configured through `RUST_LOG`.

use anyhow::{Context, Result};
use clap::Parser;
use ha_auto_entities::{load_selection, load_snapshot, Hass};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Print the entity ids a selection file matches in a state snapshot
#[derive(Parser, Debug)]
#[command(name = "auto-entities")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON snapshot of states, registries and config entries
    snapshot: PathBuf,

    /// YAML selection with includes, excludes and an optional mode
    selection: PathBuf,

    /// Report each entity once, whatever the selection's mode
    #[arg(short, long)]
    unique: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let snapshot = load_snapshot(&cli.snapshot)
        .with_context(|| format!("loading snapshot {}", cli.snapshot.display()))?;
    let mut selection = load_selection(&cli.selection)
        .with_context(|| format!("loading selection {}", cli.selection.display()))?
        .selection();
    if cli.unique {
        selection = selection.unique();
    }

    let hass = Hass::from_snapshot(snapshot);
    let entity_ids = selection.entity_ids(&hass);
    info!(count = entity_ids.len(), "Selection complete");

    for entity_id in entity_ids {
        println!("{}", entity_id);
    }
    Ok(())
}
