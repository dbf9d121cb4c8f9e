//! Application bootstrap and lifecycle management.
//!
//! [`AirFenceApp`] wires the boundary, tracker, recorder, feed and poller in a
//! fixed order so the CLI and integration tests share one assembly path.
//!
//! # Startup order
//!
//! ```text
//! 1. Boundary::load ──── fails fast: nothing else is created
//! 2. Recorder (SQLite file or in-memory)
//! 3. Telemetry source (OpenSky over reqwest, or injected)
//! 4. TransitionTracker + PollMetrics
//! 5. GeofenceEngine ──► Poller
//! ```
//!
//! # Example
//!
//! ```ignore
//! use airfence::app::{AirFenceApp, AppConfig};
//!
//! let config = AppConfig::from_config_file(&ConfigFile::load()?)?;
//! let app = AirFenceApp::start(config)?;
//! app.run_blocking(shutdown)?;
//! println!("{} cycles", app.metrics().snapshot().cycles_completed);
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::AirFenceApp;
pub use config::{AppConfig, FeedSettings, StorageTarget};
pub use error::AppError;
