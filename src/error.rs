//! Error taxonomy for the ranking and routing core.
//!
//! Each failure class has its own type so callers can match on exactly the
//! condition they care about; [`Error`] wraps all of them for functions that
//! can fail in more than one way.

use std::io;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Unknown reference frame: {0}")]
    UnknownFrame(String),
    #[error("Latitude {latitude} is outside the projectable range")]
    OutOfBounds { latitude: f64 },
    #[error("Coordinate is not a finite number")]
    NonFinite,
}

/// Why a station record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    Missing,
    NotNumeric,
    DuplicateId,
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            MalformedReason::Missing => "is missing",
            MalformedReason::NotNumeric => "is not numeric",
            MalformedReason::DuplicateId => "is duplicated in the snapshot",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Station {} field `{field}` {reason}", .kiosk_id.as_deref().unwrap_or("<unknown>"))]
pub struct MalformedStationError {
    pub kiosk_id: Option<String>,
    pub field: &'static str,
    pub reason: MalformedReason,
}

impl MalformedStationError {
    pub fn new(kiosk_id: Option<&str>, field: &'static str, reason: MalformedReason) -> Self {
        Self {
            kiosk_id: kiosk_id.map(str::to_string),
            field,
            reason,
        }
    }
}

#[derive(Error, Debug)]
pub enum RouteFetchError {
    #[error("Routing request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("Routing request timed out")]
    Timeout,
    #[error("Routing service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Routing response is not valid JSON: {0}")]
    InvalidBody(String),
    #[error("Routing response contains an empty path")]
    EmptyPath,
    #[error("Routing response contains an invalid path: {0}")]
    InvalidPath(String),
    #[error("Routing endpoint cannot be projected: {0}")]
    Projection(#[from] ProjectionError),
    #[error("Routing URL cannot be built: {0}")]
    Url(String),
}

impl From<reqwest::Error> for RouteFetchError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            RouteFetchError::Timeout
        } else {
            RouteFetchError::Network(value)
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No station with available bikes and docks")]
pub struct NoAvailableStationError;

/// Failures of the local snapshot files.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("No cached data at {0}")]
    NotFound(String),
    #[error("Cached route is unusable: {0}")]
    Route(#[from] RouteFetchError),
}

/// Failures of the station feed boundary.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Feed returned status {0}")]
    Status(u16),
    #[error("Feed body is not a feature collection: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error(transparent)]
    MalformedStation(#[from] MalformedStationError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    MalformedStation(#[from] MalformedStationError),
    #[error(transparent)]
    RouteFetch(#[from] RouteFetchError),
    #[error(transparent)]
    NoAvailableStation(#[from] NoAvailableStationError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
