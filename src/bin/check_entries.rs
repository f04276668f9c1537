// src/bin/check_entries.rs
//! Decrypt every migrated entry of a user without writing anything

use anyhow::{Context, Result};
use clap::Parser;
use journal_vault::db::SqliteStore;
use journal_vault::{check_principal, logging, StoreKeyProvider};

#[derive(Debug, Parser)]
#[command(author, version, about = "Verify that a user's migrated entries decrypt with their key")]
struct Args {
    /// User to check (default: migration.default_principal)
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
    let report = check_principal(&store, &keys, &owner)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}
