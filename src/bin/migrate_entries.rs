// src/bin/migrate_entries.rs
//! Encrypt legacy journal entries for one user, or every user

use anyhow::{Context, Result};
use clap::Parser;
use journal_vault::db::SqliteStore;
use journal_vault::{logging, migrate_all, migrate_principal, MigrationOptions, RunReport};
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "Migrate plaintext journal entries to per-user ciphertext")]
struct Args {
    /// User whose entries to migrate (default: migration.default_principal)
    #[arg(conflicts_with = "all")]
    principal: Option<String>,

    /// Migrate every user that owns entries
    #[arg(long)]
    all: bool,

    /// Snapshot legacy entries before migrating them
    #[arg(long)]
    backup: bool,

    /// Print reports as JSON instead of the text summary
    #[arg(long)]
    json: bool,
}

fn print_reports(reports: &[RunReport], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
    } else {
        for report in reports {
            println!("{report}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let config = journal_vault::load_config().context("failed to load configuration")?;
    let store = SqliteStore::from_config(config).with_context(|| {
        format!(
            "failed to open journal database at {}",
            config.store.database_path.display()
        )
    })?;

    let mut options = MigrationOptions::from(&config.migration);
    options.create_backups |= args.backup;

    let reports = if args.all {
        info!(workers = options.workers, "migrating all users");
        migrate_all(&store, &store, options).context("all-users migration failed")?
    } else {
        let owner = args
            .principal
            .unwrap_or_else(|| config.migration.default_principal.clone());
        vec![migrate_principal(&store, &owner, options)
            .with_context(|| format!("migration of {owner} aborted"))?]
    };

    print_reports(&reports, args.json)
}
