//! CLI argument definitions for graphstash.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// graphstash -- local storage for graph editor projects.
#[derive(Parser)]
#[command(
    name = "graphstash",
    version,
    about = "graphstash -- saved graphs, activity history and preferences",
    long_about = "Inspect and manage the projects, activity history and preferences the \
                  graph editor persists, backed by a local SQLite key-value store."
)]
pub struct Cli {
    /// Path to the SQLite database. Overrides GRAPHSTASH_DB.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage saved projects.
    Projects {
        /// Operate on the Hamming-graph project set instead of the general one.
        #[arg(long)]
        hamming: bool,

        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Show or edit the activity history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Show or edit user preferences.
    Prefs {
        #[command(subcommand)]
        action: PrefAction,
    },

    /// Browse the built-in example graphs.
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Show storage usage.
    Status,
}

/// Actions on a project set.
#[derive(Subcommand)]
pub enum ProjectAction {
    /// List projects, newest first.
    List,
    /// Print one project as JSON.
    Show {
        name: String,
    },
    /// Save a JSON payload under a name, replacing any project of that name.
    Save {
        name: String,
        /// File holding the JSON payload, or `-` for stdin.
        #[arg(required_unless_present = "template")]
        file: Option<PathBuf>,
        /// Save a built-in template instead of a file.
        #[arg(long, conflicts_with = "file")]
        template: Option<String>,
    },
    /// Delete a project.
    Delete {
        name: String,
    },
    /// Export every project as pretty-printed JSON.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Replace every project with the contents of an export file.
    Import {
        /// Export file, or `-` for stdin.
        file: PathBuf,
    },
    /// Show project count and stored size.
    Stats,
    /// Remove every project in the set.
    Clear,
}

/// Actions on the activity history.
#[derive(Subcommand)]
pub enum HistoryAction {
    /// List entries, newest first.
    List {
        /// Maximum number of entries to show.
        #[arg(long, short)]
        limit: Option<usize>,
    },
    /// Append an entry.
    Add {
        /// Entry kind, e.g. save, load, generate.
        kind: String,
        description: String,
    },
    /// Remove every entry.
    Clear,
}

/// Actions on preferences.
#[derive(Subcommand)]
pub enum PrefAction {
    /// Show every preference, defaults included.
    List,
    /// Show one preference.
    Get {
        key: String,
    },
    /// Set a preference. The value is parsed as JSON, falling back to a
    /// plain string.
    Set {
        key: String,
        value: String,
    },
    /// Restore the default preferences.
    Reset,
}

/// Actions on the template catalog.
#[derive(Subcommand)]
pub enum TemplateAction {
    /// List templates.
    List {
        /// Only show one category.
        #[arg(long, short)]
        category: Option<String>,
    },
    /// Show a template's nodes and edges.
    Show {
        name: String,
    },
}
