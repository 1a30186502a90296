//! CLI entry point for graphstash.
//!
//! This binary provides the `graphstash` command for inspecting and editing
//! the projects, activity history and preferences the graph editor keeps.

mod cli;
mod commands;
mod helpers;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use graphstash_store::{SqliteKeyValueStore, StorageConfig, Workspace};
use tracing::debug;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    helpers::init_tracing("warn");

    let output = run(cli)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn run(cli: Cli) -> Result<String> {
    let Cli {
        db,
        config,
        command,
    } = cli;

    match command {
        // Templates are static; no storage needed.
        Commands::Templates { action } => commands::handle_templates(action),
        Commands::Projects { hamming, action } => {
            let opened = Opened::open(db, &config)?;
            commands::handle_projects(&opened.ws, hamming, action)
        }
        Commands::History { action } => {
            let opened = Opened::open(db, &config)?;
            commands::handle_history(&opened.ws, action)
        }
        Commands::Prefs { action } => {
            let opened = Opened::open(db, &config)?;
            commands::handle_prefs(&opened.ws, action)
        }
        Commands::Status => {
            let opened = Opened::open(db, &config)?;
            commands::handle_status(&opened.ws, &opened.store, &opened.config)
        }
    }
}

/// Config, store and workspace for one invocation.
struct Opened {
    config: StorageConfig,
    store: SqliteKeyValueStore,
    ws: Workspace,
}

impl Opened {
    fn open(db: Option<PathBuf>, config_path: &Path) -> Result<Self> {
        let config = StorageConfig::load(config_path)
            .with_context(|| format!("failed to load config {}", config_path.display()))?;
        let db_path = helpers::resolve_db_path(db);
        debug!(path = %db_path.display(), "resolved database path");

        let (ws, store) = helpers::open_workspace(&db_path, &config)?;
        Ok(Self { config, store, ws })
    }
}
