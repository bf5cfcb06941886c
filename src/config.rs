//! Runtime configuration.
//!
//! A [`Config`] is built once at startup and handed to each component. Values
//! come from the environment (optionally a `.env` file) with defaults for
//! everything except the routing API key.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::error::ProjectionError;
use crate::geo::{Position, Projector};

pub const DEFAULT_FEED_URL: &str = "https://bikeshare.metro.net/stations/json";
pub const DEFAULT_FEED_REFERER: &str = "https://bikeshare.metro.net/stations/";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64) AppleWebkit/537.36 (KHTML, like Gecko) Chrome/93.0.4577.63 Safari/537.36";
pub const DEFAULT_ROUTING_URL: &str = "https://api.openrouteservice.org";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Downtown Los Angeles.
pub const DEFAULT_POSITION: Position = Position::geographic(34.04919, -118.24799);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} is not a valid url: {reason}")]
    InvalidUrl { name: &'static str, reason: String },
    #[error("{name} must be a positive number, got `{value}`")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("{name} value is not valid unicode")]
    NotUnicode { name: &'static str },
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub feed_url: Url,
    pub feed_user_agent: String,
    pub feed_referer: String,
    pub routing_base_url: Url,
    pub routing_api_key: Option<String>,
    pub data_dir: PathBuf,
    pub routes_dir: PathBuf,
    pub request_timeout: Duration,
    pub projector: Projector,
    pub default_position: Position,
    pub default_k: usize,
    pub availability_threshold: u32,
}

impl Config {
    /// Reads the process environment.
    pub fn env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name))
    }

    /// Builds a config from any variable lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let var = |name: &'static str| -> Result<Option<String>, ConfigError> {
            match lookup(name) {
                Ok(value) if value.trim().is_empty() => Ok(None),
                Ok(value) => Ok(Some(value)),
                Err(std::env::VarError::NotPresent) => Ok(None),
                Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode { name }),
            }
        };
        let url = |name: &'static str, default: &str| -> Result<Url, ConfigError> {
            let raw = var(name)?.unwrap_or_else(|| default.to_string());
            Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
                name,
                reason: e.to_string(),
            })
        };

        let request_timeout = match var("REQUEST_TIMEOUT_SECS")? {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().ok().filter(|s| *s > 0);
                let secs = secs.ok_or(ConfigError::InvalidNumber {
                    name: "REQUEST_TIMEOUT_SECS",
                    value: raw,
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let geographic = var("GEOGRAPHIC_CRS")?;
        let planar = var("PLANAR_CRS")?;
        let projector = Projector::from_codes(
            geographic.as_deref().unwrap_or("EPSG:4326"),
            planar.as_deref().unwrap_or("EPSG:3857"),
        )?;

        Ok(Config {
            feed_url: url("STATION_FEED_URL", DEFAULT_FEED_URL)?,
            feed_user_agent: var("STATION_FEED_USER_AGENT")?
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            feed_referer: var("STATION_FEED_REFERER")?
                .unwrap_or_else(|| DEFAULT_FEED_REFERER.to_string()),
            routing_base_url: url("ORS_BASE_URL", DEFAULT_ROUTING_URL)?,
            routing_api_key: var("ORS_API_KEY")?,
            data_dir: PathBuf::from(var("DATA_DIR")?.unwrap_or_else(|| "data".to_string())),
            routes_dir: PathBuf::from(var("ROUTES_DIR")?.unwrap_or_else(|| "routes".to_string())),
            request_timeout,
            projector,
            default_position: DEFAULT_POSITION,
            default_k: 5,
            availability_threshold: 1,
        })
    }

    /// The routing key, required only by commands that call the directions
    /// service.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.routing_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("ORS_API_KEY"))
    }
}
