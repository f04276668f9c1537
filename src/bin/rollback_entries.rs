// src/bin/rollback_entries.rs
//! Restore a user's entries from backup snapshots and drop their key

use anyhow::{Context, Result};
use clap::Parser;
use journal_vault::db::SqliteStore;
use journal_vault::{logging, rollback_principal, StoreKeyProvider};

#[derive(Debug, Parser)]
#[command(author, version, about = "Roll a user's journal entries back to their pre-migration payloads")]
struct Args {
    /// User to roll back (default: migration.default_principal)
    principal: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let config = journal_vault::load_config().context("failed to load configuration")?;
    let store = SqliteStore::from_config(config).context("failed to open journal database")?;
    let owner = args
        .principal
        .unwrap_or_else(|| config.migration.default_principal.clone());

    let keys = StoreKeyProvider::new(&store);
    let report = rollback_principal(&store, &keys, &owner)
        .with_context(|| format!("rollback of {owner} aborted"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}
