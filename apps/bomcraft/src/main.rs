//! # bomcraft - Crafting Requirements Calculator
//!
//! ## Usage
//!
//! ```bash
//! bomcraft init
//! bomcraft seed -f items.json
//! bomcraft resolve 42
//! bomcraft --json-mode resolve 42 --max-depth 8
//! bomcraft -B file -D catalog.snap export -o catalog.json -t json
//! ```

use bomcraft::cli::{self, Cli};
use bomcraft::config::{FileConfig, LOG_FORMAT_ENV, LogFormat, Overrides, Settings};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = Cli::parse();

    let file_config = match FileConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let overrides = Overrides {
        database: cli.database.clone(),
        backend: cli.backend,
        verbose: cli.verbose,
        log_format_env: std::env::var(LOG_FORMAT_ENV).ok(),
    };
    let settings = Settings::resolve(&overrides, &file_config);

    init_tracing(&settings);

    if let Err(e) = cli::execute(cli.command, &settings, cli.json_mode) {
        tracing::error!("Error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
fn init_tracing(settings: &Settings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| settings.log_filter.as_str().into());

    match settings.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
