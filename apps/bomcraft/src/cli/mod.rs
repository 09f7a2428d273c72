//! # bomcraft CLI Module
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new empty catalog
//! - `seed` - Load items from a spreadsheet JSON export
//! - `list` - List items
//! - `item` - Show one item and its direct components
//! - `resolve` - Compute the crafting requirements of an item
//! - `status` - Show catalog status
//! - `export` - Export the catalog to a file
//! - `import` - Replace the catalog from a file

mod commands;

use crate::config::{Backend, Settings};
use crate::error::AppError;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// bomcraft - crafting requirements calculator
///
/// Resolves the full bill of materials of an item: exact credit cost,
/// crafting minutes, downtime and the ordered intermediate steps.
#[derive(Parser, Debug)]
#[command(name = "bomcraft")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the catalog database [default: bomcraft.db]
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend [default: redb]
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Path to the configuration file [default: ./bomcraft.toml if present]
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Binary snapshot (header + postcard payload)
    Snapshot,
    /// Pretty-printed JSON
    Json,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty catalog
    Init {
        /// Force initialization even if the database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Seed the catalog from a JSON array of item records
    Seed {
        /// Path to the items file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List items
    List {
        /// Only items of this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Show one item and its direct components
    Item {
        /// Item id
        id: u64,
    },

    /// Compute the crafting requirements of one unit of an item
    Resolve {
        /// Item id
        id: u64,

        /// Maximum expansion depth (capped at 256)
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Show catalog status
    Status,

    /// Export the catalog
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format
        #[arg(short = 't', long, value_enum, default_value = "snapshot")]
        format: ExportFormat,
    },

    /// Replace the catalog from a snapshot or JSON export
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and resolved settings.
pub fn execute(
    command: Option<Commands>,
    settings: &Settings,
    json_mode: bool,
) -> Result<(), AppError> {
    match command {
        Some(Commands::Init { force }) => cmd_init(settings, force),
        Some(Commands::Seed { file }) => cmd_seed(settings, json_mode, &file),
        Some(Commands::List { category }) => cmd_list(settings, json_mode, category.as_deref()),
        Some(Commands::Item { id }) => cmd_item(settings, json_mode, id),
        Some(Commands::Resolve { id, max_depth }) => {
            cmd_resolve(settings, json_mode, id, max_depth)
        }
        Some(Commands::Export { output, format }) => cmd_export(settings, &output, format),
        Some(Commands::Import { input }) => cmd_import(settings, &input),
        Some(Commands::Status) | None => cmd_status(settings, json_mode),
    }
}
