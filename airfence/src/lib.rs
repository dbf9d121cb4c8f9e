//! AirFence - boundary crossing tracker for live aircraft telemetry
//!
//! This library polls an aircraft state-vector feed, tests every reported
//! position against a fixed geographic boundary, keeps per-aircraft membership
//! state across polling cycles, and records each observation in an append-only
//! log. "Entered"/"left" events are emitted exactly when an aircraft's
//! membership changes.
//!
//! # Architecture
//!
//! ```text
//! Poller ──► TelemetrySource ──► GeofenceEngine (one observation at a time)
//!                                  │
//!                                  ├─► MembershipOracle (Boundary)
//!                                  ├─► TransitionTracker
//!                                  ├─► ObservationRecorder
//!                                  └─► EventSink (if a transition occurred)
//! ```
//!
//! The binary in `airfence-cli` wires these together through [`app::AirFenceApp`].

pub mod app;
pub mod boundary;
pub mod config;
pub mod engine;
pub mod feed;
pub mod geo_bounds;
pub mod logging;
pub mod model;
pub mod poller;
pub mod recorder;
pub mod sink;
pub mod telemetry;
pub mod tracker;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
