//! # Suplementor - Supplement Knowledge Server
//!
//! The main binary for the Suplementor content platform.
//!
//! This application provides:
//! - HTTP JSON API server (axum-based) over the history and knowledge routers
//! - CLI interface for seeding, exporting and querying the content database
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 apps/suplementor (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐     │
//! │  │   CLI       │    │   HTTP API  │    │  Config          │     │
//! │  │  (clap)     │    │   (axum)    │    │  (toml + env)    │     │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘     │
//! │         │                  │                    │               │
//! │         └──────────────────┼────────────────────┘               │
//! │                            ▼                                    │
//! │                  ┌──────────────────┐                           │
//! │                  │ suplementor-core │                           │
//! │                  │   (THE LOGIC)    │                           │
//! │                  └──────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! suplementor server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! suplementor seed -f data/seed.json
//! suplementor search ginseng --limit 5
//! suplementor timeline --system TCM
//! ```

use clap::Parser;
use suplementor::cli;
use suplementor::config::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Settings decide the log format, so they are resolved before tracing exists.
    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let default_filter = if cli.verbose {
        "suplementor=debug,suplementor_core=debug,tower_http=debug"
    } else {
        "suplementor=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, config).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Suplementor startup banner.
fn print_banner() {
    println!(
        r#"
  ╔═╗╦ ╦╔═╗╦  ╔═╗╔╦╗╔═╗╔╗╔╔╦╗╔═╗╦═╗
  ╚═╗║ ║╠═╝║  ║╣ ║║║║╣ ║║║ ║ ║ ║╠╦╝
  ╚═╝╚═╝╩  ╩═╝╚═╝╩ ╩╚═╝╝╚╝ ╩ ╚═╝╩╚═

  Supplement Knowledge Server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
