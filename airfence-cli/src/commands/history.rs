//! History command - print recorded observations.

use std::path::PathBuf;

use airfence::model::EntityId;
use airfence::recorder::{ObservationRecorder, SqliteRecorder, StoredObservation};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the history command.
///
/// Without an entity, lists every aircraft in the log.
pub fn run(
    config: Option<PathBuf>,
    database: Option<PathBuf>,
    entity: Option<String>,
    verbose: bool,
) -> Result<(), CliError> {
    let runner = CliRunner::new(config.as_deref(), verbose, false)?;
    let path = database.unwrap_or_else(|| runner.config().storage.database.clone());

    // Opening would create an empty database.
    if !path.exists() {
        return Err(CliError::Config(format!(
            "No observation database at {}",
            path.display()
        )));
    }
    let recorder = SqliteRecorder::open(&path)?;

    match entity {
        None => {
            let entities = recorder.entities()?;
            println!(
                "{} aircraft, {} observations in {}",
                entities.len(),
                recorder.count()?,
                path.display()
            );
            for entity in entities {
                println!("  {}", entity);
            }
        }
        Some(raw) => {
            let entity = EntityId::new(&raw).map_err(|e| CliError::InvalidInput(e.to_string()))?;
            let rows = recorder.history(&entity)?;
            if rows.is_empty() {
                println!("No observations recorded for {}", entity);
            } else {
                print_rows(&rows);
            }
        }
    }

    Ok(())
}

fn print_rows(rows: &[StoredObservation]) {
    println!(
        "{:>7}  {:<19}  {:<8}  {:>9}  {:>10}  {:>8}  {}",
        "id", "time", "callsign", "latitude", "longitude", "alt (m)", "inside"
    );

    let mut previous: Option<bool> = None;
    for row in rows {
        let marker = match (previous, row.in_boundary) {
            (Some(false), true) => "  entered",
            (Some(true), false) => "  left",
            _ => "",
        };
        println!(
            "{:>7}  {:<19}  {:<8}  {:>9.4}  {:>10.4}  {:>8}  {}{}",
            row.id.0,
            row.time,
            row.label.as_deref().unwrap_or("-"),
            row.latitude,
            row.longitude,
            row.altitude
                .map(|a| format!("{:.0}", a))
                .unwrap_or_else(|| "-".to_string()),
            if row.in_boundary { 1 } else { 0 },
            marker
        );
        previous = Some(row.in_boundary);
    }
}
