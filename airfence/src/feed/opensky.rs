//! OpenSky Network state-vector feed.
//!
//! # Request
//!
//! `GET https://opensky-network.org/api/states/all?lamin=..&lomin=..&lamax=..&lomax=..`
//! with optional HTTP basic auth.
//!
//! # Response
//!
//! ```text
//! {"time": 1700000000, "states": [[icao24, callsign, origin_country,
//!   time_position, last_contact, longitude, latitude, baro_altitude, ...], ...]}
//! ```
//!
//! `states` is `null` when no aircraft are in the box. Longitude and latitude
//! may be `null` for aircraft without a recent position report.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, trace};

use super::{Credentials, FeedBatch, FetchError, HttpClient, TelemetrySource};
use crate::geo_bounds::{GeoBounds, Position};
use crate::model::{EntityId, Observation, ObservationError};

/// Default state-vector endpoint.
pub const OPENSKY_STATES_URL: &str = "https://opensky-network.org/api/states/all";

// Indices into a state vector.
const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_TIME_POSITION: usize = 3;
const IDX_LAST_CONTACT: usize = 4;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;

/// OpenSky Network telemetry source.
///
/// # Example
///
/// ```ignore
/// use airfence::feed::{Credentials, OpenSkySource, ReqwestClient};
///
/// let source = OpenSkySource::new(ReqwestClient::new()?)
///     .with_credentials(Some(Credentials::new("user", "pass")));
/// ```
pub struct OpenSkySource<C: HttpClient> {
    http_client: C,
    base_url: String,
    credentials: Option<Credentials>,
}

impl<C: HttpClient> OpenSkySource<C> {
    /// Creates a source for the public endpoint without credentials.
    pub fn new(http_client: C) -> Self {
        Self {
            http_client,
            base_url: OPENSKY_STATES_URL.to_string(),
            credentials: None,
        }
    }

    /// Use a different endpoint (mirrors, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Authenticate requests with basic auth.
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Builds the request URL for a bounding box.
    fn build_url(&self, bounds: &GeoBounds) -> String {
        format!(
            "{}?lamin={}&lomin={}&lamax={}&lomax={}",
            self.base_url, bounds.min_lat, bounds.min_lon, bounds.max_lat, bounds.max_lon
        )
    }
}

impl<C: HttpClient> TelemetrySource for OpenSkySource<C> {
    fn fetch(&self, bounds: &GeoBounds) -> Result<FeedBatch, FetchError> {
        let url = self.build_url(bounds);
        debug!(url = %url, authenticated = self.credentials.is_some(), "Fetching state vectors");

        let body = self.http_client.get(&url, self.credentials.as_ref())?;
        parse_states(&body, Utc::now())
    }

    fn name(&self) -> &str {
        "OpenSky Network"
    }
}

/// Parse a state-vector response body.
///
/// `fetched_at` is the fallback timestamp for entries (and responses) that
/// carry no time of their own.
pub fn parse_states(body: &[u8], fetched_at: DateTime<Utc>) -> Result<FeedBatch, FetchError> {
    let root: Value =
        serde_json::from_slice(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    let object = root
        .as_object()
        .ok_or_else(|| FetchError::Malformed("No data returned from API".to_string()))?;

    if let Some(error) = object.get("error") {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(FetchError::Api(message));
    }

    let feed_time = object
        .get("time")
        .and_then(Value::as_i64)
        .and_then(unix_time);

    let states = match object.get("states") {
        None | Some(Value::Null) => {
            return Ok(FeedBatch {
                feed_time,
                ..FeedBatch::default()
            })
        }
        Some(Value::Array(states)) => states,
        Some(other) => {
            return Err(FetchError::Malformed(format!(
                "'states' is not an array: {}",
                other
            )))
        }
    };

    let fallback = feed_time.unwrap_or(fetched_at);
    let mut batch = FeedBatch {
        observations: Vec::with_capacity(states.len()),
        discarded: 0,
        feed_time,
    };

    for state in states {
        match parse_state(state, fallback) {
            Ok(observation) => batch.observations.push(observation),
            Err(reason) => {
                trace!(%reason, "Discarding state vector");
                batch.discarded += 1;
            }
        }
    }

    Ok(batch)
}

fn parse_state(state: &Value, fallback: DateTime<Utc>) -> Result<Observation, ObservationError> {
    let fields = state
        .as_array()
        .ok_or_else(|| ObservationError::MissingPosition("<malformed>".to_string()))?;

    let field = |index: usize| fields.get(index).filter(|v| !v.is_null());

    let entity = EntityId::new(field(IDX_ICAO24).and_then(Value::as_str).unwrap_or(""))?;

    let (latitude, longitude) = match (
        field(IDX_LATITUDE).and_then(Value::as_f64),
        field(IDX_LONGITUDE).and_then(Value::as_f64),
    ) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Err(ObservationError::MissingPosition(entity.to_string())),
    };

    let timestamp = field(IDX_TIME_POSITION)
        .and_then(Value::as_i64)
        .or_else(|| field(IDX_LAST_CONTACT).and_then(Value::as_i64))
        .and_then(unix_time)
        .unwrap_or(fallback);

    let label = field(IDX_CALLSIGN).and_then(Value::as_str).unwrap_or("");
    let altitude = field(IDX_BARO_ALTITUDE).and_then(Value::as_f64);

    Ok(
        Observation::new(entity, Position::new(latitude, longitude), timestamp)?
            .with_label(label)
            .with_altitude(altitude),
    )
}

fn unix_time(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::MockHttpClient;

    const SAMPLE: &str = r#"{
        "time": 1700000100,
        "states": [
            ["508c5e", "AUI101  ", "Ukraine", 1700000095, 1700000099, 30.5234, 50.4501, 10668.0, false, 230.1, 90.0, 0.0, null, 10900.0, "1000", false, 0],
            ["4b1805", "SWR12   ", "Switzerland", null, 1700000090, null, null, null, true, 0.0, 0.0, null, null, null, null, false, 0],
            ["3c6444", null, "Germany", null, null, 24.0, 48.0, null, false, 200.0, 45.0, 0.0, null, null, null, false, 0],
            ["", "GHOST", "Nowhere", null, null, 24.0, 48.0, null, false, 0.0, 0.0, 0.0, null, null, null, false, 0],
            ["abcdef", "BAD", "Nowhere", null, null, 24.0, 95.0, null, false, 0.0, 0.0, 0.0, null, null, null, false, 0]
        ]
    }"#;

    fn fetched_at() -> DateTime<Utc> {
        Utc.timestamp_opt(1_800_000_000, 0).unwrap()
    }

    #[test]
    fn test_parse_sample() {
        let batch = parse_states(SAMPLE.as_bytes(), fetched_at()).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.discarded, 3);
        assert_eq!(batch.feed_time, Utc.timestamp_opt(1_700_000_100, 0).single());

        let first = &batch.observations[0];
        assert_eq!(first.entity.as_str(), "508c5e");
        assert_eq!(first.label.as_deref(), Some("AUI101"));
        assert_eq!(first.position, Position::new(50.4501, 30.5234));
        assert_eq!(first.altitude, Some(10668.0));
        assert_eq!(first.timestamp, Utc.timestamp_opt(1_700_000_095, 0).unwrap());
    }

    #[test]
    fn test_missing_times_fall_back_to_feed_time() {
        let batch = parse_states(SAMPLE.as_bytes(), fetched_at()).unwrap();
        let second = &batch.observations[1];
        assert_eq!(second.entity.as_str(), "3c6444");
        assert_eq!(second.label, None);
        assert_eq!(second.altitude, None);
        assert_eq!(second.timestamp, Utc.timestamp_opt(1_700_000_100, 0).unwrap());
    }

    #[test]
    fn test_no_feed_time_falls_back_to_fetch_time() {
        let body = r#"{"states": [["a1", "X", "", null, null, 1.0, 2.0, null]]}"#;
        let batch = parse_states(body.as_bytes(), fetched_at()).unwrap();
        assert_eq!(batch.observations[0].timestamp, fetched_at());
    }

    #[test]
    fn test_null_states_is_empty_batch() {
        let batch = parse_states(br#"{"time": 1700000000, "states": null}"#, fetched_at()).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.discarded, 0);
    }

    #[test]
    fn test_api_error_payload() {
        let result = parse_states(br#"{"error": "rate limited"}"#, fetched_at());
        assert!(matches!(result, Err(FetchError::Api(msg)) if msg == "rate limited"));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            parse_states(b"<html>", fetched_at()),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(
            parse_states(b"null", fetched_at()),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(
            parse_states(br#"{"states": 5}"#, fetched_at()),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_fetch_builds_bounded_url_with_credentials() {
        let mock = MockHttpClient::ok(r#"{"time": 1, "states": null}"#);
        let source = OpenSkySource::new(mock)
            .with_base_url("http://localhost/api/states/all")
            .with_credentials(Some(Credentials::new("pilot", "secret")));

        let bounds = GeoBounds::new(44.38, 52.38, 22.14, 40.23);
        source.fetch(&bounds).unwrap();

        let requests = source.http_client.requests.lock();
        let (url, creds) = &requests[0];
        assert_eq!(
            url,
            "http://localhost/api/states/all?lamin=44.38&lomin=22.14&lamax=52.38&lomax=40.23"
        );
        assert_eq!(creds.as_ref().map(|c| c.username.as_str()), Some("pilot"));
    }

    #[test]
    fn test_fetch_propagates_http_errors() {
        let mock = MockHttpClient::err(FetchError::Status {
            status: 503,
            body: "unavailable".to_string(),
        });
        let source = OpenSkySource::new(mock);
        let result = source.fetch(&GeoBounds::new(0.0, 1.0, 0.0, 1.0));
        assert!(matches!(result, Err(FetchError::Status { status: 503, .. })));
        assert_eq!(source.name(), "OpenSky Network");
    }
}
