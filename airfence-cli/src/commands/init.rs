//! Init command - write a configuration file with defaults.

use std::path::{Path, PathBuf};

use airfence::config::ConfigFile;

use crate::error::CliError;

/// Run the init command.
///
/// Existing settings are kept; `boundary` only fills an unset boundary path.
/// A file that exists but does not parse is left alone and reported.
pub fn run(config: Option<PathBuf>, boundary: Option<PathBuf>) -> Result<(), CliError> {
    let path = super::config_path(config);
    let config = write_config(&path, boundary)?;

    println!("Configuration file: {}", path.display());
    println!();
    match &config.boundary.path {
        Some(boundary) => println!("Boundary: {}", boundary.display()),
        None => {
            println!("No boundary configured yet. Set one with:");
            println!("  airfence config set boundary.path /path/to/boundary.geojson");
        }
    }
    println!("Database: {}", config.storage.database.display());
    println!();
    println!("Edit this file to customize AirFence settings.");
    println!("CLI arguments override config file values when specified.");

    Ok(())
}

fn write_config(path: &Path, boundary: Option<PathBuf>) -> Result<ConfigFile, CliError> {
    // Only a missing file loads as defaults; anything unreadable stops here.
    let mut config = ConfigFile::load_from(path)?;

    if config.boundary.path.is_none() {
        config.boundary.path = boundary;
    }
    config.save_to(path)?;
    Ok(config)
}
