//! # Suplementor CLI Module
//!
//! This module implements the CLI interface for Suplementor.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show content counts
//! - `init` - Initialize a new database
//! - `seed` - Load a JSON seed bundle into the database
//! - `export` - Write the database out as a seed bundle
//! - `search` - Search supplement history
//! - `timeline` - Print the history timeline

mod commands;

use crate::config::ServerConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use suplementor_core::SuplementorError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Suplementor - supplement knowledge server
///
/// Serves the supplement knowledge graph and the history of supplement use
/// across medicine systems.
#[derive(Parser, Debug)]
#[command(name = "suplementor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a suplementor.toml configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the content database (overrides config and SUPLEMENTOR_DATABASE)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show content counts
    Status,

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Load a JSON seed bundle ({nodes, relationships, history})
    Seed {
        /// Path to the bundle
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Export the database as a JSON seed bundle
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Search supplement history (ranked, with substring fallback)
    Search {
        /// Search text
        query: String,

        /// Maximum number of results (1-50)
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Print the history timeline
    Timeline {
        /// Restrict to one medicine system (e.g. TCM, AYURVEDA)
        #[arg(short, long)]
        system: Option<String>,
    },
}

impl Cli {
    /// Resolve settings: config file, then environment, then CLI flags.
    pub fn resolve_config(&self) -> Result<ServerConfig, SuplementorError> {
        let (host, port) = match &self.command {
            Some(Commands::Server { host, port }) => (host.clone(), *port),
            _ => (None, None),
        };
        Ok(ServerConfig::load(self.config.as_deref())?
            .with_process_env()?
            .with_overrides(self.database.clone(), host, port))
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and resolved settings.
pub async fn execute(cli: Cli, config: ServerConfig) -> Result<(), SuplementorError> {
    let json_mode = cli.json_mode;
    let db_path = config.database.clone();

    match cli.command {
        Some(Commands::Server { .. }) => cmd_server(config).await,
        Some(Commands::Status) => cmd_status(&db_path, json_mode),
        Some(Commands::Init { force }) => cmd_init(&db_path, force),
        Some(Commands::Seed { file }) => cmd_seed(&db_path, json_mode, &file),
        Some(Commands::Export { output }) => cmd_export(&db_path, &output),
        Some(Commands::Search { query, limit }) => cmd_search(&db_path, json_mode, query, limit),
        Some(Commands::Timeline { system }) => cmd_timeline(&db_path, json_mode, system),
        None => {
            // No subcommand - show status by default
            cmd_status(&db_path, json_mode)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
