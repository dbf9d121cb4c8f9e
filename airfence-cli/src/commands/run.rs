//! Run command - poll the feed until interrupted.

use std::path::PathBuf;

use airfence::app::{AirFenceApp, AppConfig, StorageTarget};
use airfence::config::ConfigFile;
use airfence::telemetry::TelemetrySnapshot;
use tokio_util::sync::CancellationToken;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the run command.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub boundary: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub interval: Option<u64>,
    pub dry_run: bool,
    pub verbose: bool,
    pub no_log_file: bool,
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), args.verbose, !args.no_log_file)?;
    runner.log_startup("run");

    let app_config = resolve_app_config(runner.config(), &args)?;

    println!("AirFence v{}", airfence::VERSION);
    println!("==============");
    println!();
    println!("Boundary: {}", app_config.boundary_path.display());
    match &app_config.storage {
        StorageTarget::Sqlite(path) => println!("Database: {}", path.display()),
        StorageTarget::Memory => println!("Database: (dry run, in memory)"),
    }
    println!("Feed:     {}", app_config.feed.url);
    println!("Interval: {}s", app_config.poller.interval.as_secs());
    println!();

    // Fails here, before any polling, if the boundary is unusable.
    let app = AirFenceApp::start(app_config)?;
    println!("Bounds:   {}", app.boundary().bounds());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let shutdown = CancellationToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, finishing current observation...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    app.run_blocking(shutdown)?;

    print_summary(&app.metrics().snapshot(), app.tracker().len());
    Ok(())
}

/// Apply CLI overrides on top of the config file.
fn resolve_app_config(config: &ConfigFile, args: &RunArgs) -> Result<AppConfig, CliError> {
    let mut config = config.clone();

    if let Some(boundary) = &args.boundary {
        config.boundary.path = Some(boundary.clone());
    }
    if let Some(database) = &args.database {
        config.storage.database = database.clone();
    }
    if let Some(secs) = args.interval {
        if secs == 0 {
            return Err(CliError::InvalidInput(
                "--interval must be at least 1 second".to_string(),
            ));
        }
        config.poll.interval_secs = secs;
    }

    let app_config = AppConfig::from_config_file(&config)?;
    Ok(if args.dry_run {
        app_config.with_storage(StorageTarget::Memory)
    } else {
        app_config
    })
}

fn print_summary(snapshot: &TelemetrySnapshot, aircraft: usize) {
    println!();
    println!("Session Summary");
    println!("───────────────");
    println!(
        "  Cycles:        {} completed, {} skipped",
        snapshot.cycles_completed, snapshot.cycles_skipped
    );
    println!(
        "  Observations:  {} ({:.0}% inside), {} discarded",
        snapshot.observations_processed,
        snapshot.inside_rate() * 100.0,
        snapshot.entries_discarded
    );
    println!("  Aircraft seen: {}", aircraft);
    println!(
        "  Transitions:   {} entered, {} left",
        snapshot.entered, snapshot.left
    );
    if snapshot.record_failures > 0 || snapshot.fetch_failures > 0 {
        println!(
            "  Failures:      {} fetch, {} record",
            snapshot.fetch_failures, snapshot.record_failures
        );
    }
    println!("  Uptime:        {}", snapshot.uptime_human());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn file_with_boundary() -> ConfigFile {
        let mut config = ConfigFile::default();
        config.boundary.path = Some(PathBuf::from("/data/zone.geojson"));
        config
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let args = RunArgs {
            boundary: Some(PathBuf::from("/tmp/other.geojson")),
            database: Some(PathBuf::from("/tmp/positions.db")),
            interval: Some(30),
            ..Default::default()
        };

        let config = resolve_app_config(&file_with_boundary(), &args).unwrap();
        assert_eq!(config.boundary_path, PathBuf::from("/tmp/other.geojson"));
        assert_eq!(
            config.storage,
            StorageTarget::Sqlite(PathBuf::from("/tmp/positions.db"))
        );
        assert_eq!(config.poller.interval, Duration::from_secs(30));
    }

    #[test]
    fn test_dry_run_uses_memory_store() {
        let args = RunArgs {
            dry_run: true,
            ..Default::default()
        };
        let config = resolve_app_config(&file_with_boundary(), &args).unwrap();
        assert_eq!(config.storage, StorageTarget::Memory);
    }

    #[test]
    fn test_missing_boundary_and_zero_interval_rejected() {
        assert!(resolve_app_config(&ConfigFile::default(), &RunArgs::default()).is_err());

        let args = RunArgs {
            interval: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            resolve_app_config(&file_with_boundary(), &args),
            Err(CliError::InvalidInput(_))
        ));
    }
}
