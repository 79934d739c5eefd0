//! filedb - content identity and technical metadata for archive storage objects.
//!
//! Every file of a storage object is digested, classified by content, and
//! described by one technical record. Identical content stored at several
//! paths is counted once.
//!
//! # Usage
//!
//! ```bash
//! # Catalog one object directory
//! filedb scan /srv/Archive0/W22084 --object W22084
//!
//! # Write JSON Lines to a file
//! filedb scan ./W22084 --object W22084 --output W22084.jsonl
//!
//! # View configuration
//! filedb config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// filedb - catalog archive storage files by content.
#[derive(Parser, Debug)]
#[command(name = "filedb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Digest, classify and catalog every file of a storage object
    Scan(cli::scan::ScanArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match filedb_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `filedb config path`."
            );
            filedb_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("filedb v{}", filedb_core::VERSION);

    match cli.command {
        Commands::Scan(args) => cli::scan::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
