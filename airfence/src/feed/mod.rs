//! Upstream aircraft telemetry.
//!
//! A [`TelemetrySource`] returns one batch of validated observations for a
//! bounding box. Entries without a usable position never leave this module;
//! they are counted in [`FeedBatch::discarded`] and otherwise ignored.
//!
//! ```ignore
//! use airfence::feed::{OpenSkySource, ReqwestClient, TelemetrySource};
//!
//! let source = OpenSkySource::new(ReqwestClient::new()?);
//! let batch = source.fetch(&boundary.bounds())?;
//! ```

mod http;
mod opensky;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::geo_bounds::GeoBounds;
use crate::model::Observation;

pub use http::{Credentials, HttpClient, ReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use opensky::{parse_states, OpenSkySource, OPENSKY_STATES_URL};

#[cfg(test)]
pub use http::tests::MockHttpClient;

/// Errors that can occur while fetching a telemetry batch.
///
/// These are handled by the poller: the cycle is skipped and tracker state is
/// left untouched.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    /// Transport-level failure (DNS, connect, timeout, truncated body).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The API answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not the expected JSON shape.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// The API reported an error in its payload.
    #[error("API error: {0}")]
    Api(String),
}

/// One fetched batch of observations.
#[derive(Debug, Clone, Default)]
pub struct FeedBatch {
    /// Valid observations, in feed order.
    pub observations: Vec<Observation>,
    /// Entries dropped for missing or invalid position or id.
    pub discarded: usize,
    /// Snapshot time reported by the feed, if any.
    pub feed_time: Option<DateTime<Utc>>,
}

impl FeedBatch {
    /// Number of valid observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the batch holds no observations.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// A producer of observation batches for a region.
pub trait TelemetrySource: Send + Sync {
    /// Fetch the current batch for a bounding box.
    fn fetch(&self, bounds: &GeoBounds) -> Result<FeedBatch, FetchError>;

    /// Human-readable source name.
    fn name(&self) -> &str;
}
