//! AirFence CLI - Command-line interface
//!
//! Polls a live aircraft position feed, records every position in a SQLite
//! log, and reports aircraft entering or leaving a GeoJSON boundary.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::run::RunArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "airfence", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (RUST_LOG overrides)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Use a configuration file other than ~/.airfence/config.ini
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the configuration file with default settings
    Init {
        /// Boundary file to record in the new configuration
        #[arg(long, value_name = "FILE")]
        boundary: Option<PathBuf>,
    },

    /// Poll the feed and track boundary crossings until Ctrl+C
    Run {
        /// Boundary file (.geojson, .json or .shp)
        #[arg(long, value_name = "FILE")]
        boundary: Option<PathBuf>,

        /// SQLite observation database
        #[arg(long, value_name = "FILE")]
        database: Option<PathBuf>,

        /// Seconds between polls
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,

        /// Keep observations in memory instead of the database
        #[arg(long)]
        dry_run: bool,

        /// Log to stderr only
        #[arg(long)]
        no_log_file: bool,
    },

    /// Test whether a position lies inside the boundary
    Check {
        /// Boundary file (.geojson, .json or .shp)
        #[arg(long, value_name = "FILE")]
        boundary: Option<PathBuf>,

        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },

    /// Show recorded observations for one aircraft, or list all aircraft
    History {
        /// ICAO24 address (case-insensitive)
        entity: Option<String>,

        /// SQLite observation database
        #[arg(long, value_name = "FILE")]
        database: Option<PathBuf>,
    },

    /// View or modify configuration settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let verbose = cli.verbose > 0;

    match cli.command {
        Commands::Init { boundary } => commands::init::run(cli.config, boundary),
        Commands::Run {
            boundary,
            database,
            interval,
            dry_run,
            no_log_file,
        } => commands::run::run(RunArgs {
            config: cli.config,
            boundary,
            database,
            interval,
            dry_run,
            verbose,
            no_log_file,
        }),
        Commands::Check { boundary, lat, lon } => {
            commands::check::run(cli.config, boundary, lat, lon, verbose)
        }
        Commands::History { entity, database } => {
            commands::history::run(cli.config, database, entity, verbose)
        }
        Commands::Config(command) => commands::config::run(cli.config, command),
    }
}
