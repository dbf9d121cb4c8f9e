//! Check command - test one position against a boundary file.

use std::path::PathBuf;

use airfence::boundary::{Boundary, MembershipOracle};
use airfence::geo_bounds::Position;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the check command.
pub fn run(
    config: Option<PathBuf>,
    boundary: Option<PathBuf>,
    latitude: f64,
    longitude: f64,
    verbose: bool,
) -> Result<(), CliError> {
    let runner = CliRunner::new(config.as_deref(), verbose, false)?;

    let path = boundary
        .or_else(|| runner.config().boundary.path.clone())
        .ok_or_else(|| {
            CliError::Config(
                "No boundary file given. Use --boundary or set boundary.path.".to_string(),
            )
        })?;

    let position = Position::new(latitude, longitude);
    if !position.is_valid() {
        return Err(CliError::InvalidInput(format!(
            "position {} is outside valid latitude/longitude ranges",
            position
        )));
    }

    let boundary = Boundary::load(&path)?;
    let inside = boundary.contains(position);

    println!("Boundary: {}", path.display());
    println!(
        "  {} polygon(s), {} vertices",
        boundary.polygon_count(),
        boundary.vertex_count()
    );
    println!("  Bounds: {}", boundary.bounds());
    println!();
    println!(
        "Position {} is {}",
        position,
        if inside { "INSIDE" } else { "OUTSIDE" }
    );

    Ok(())
}
