//! Station feed fetching and the on-disk snapshot of the last good fetch.
//!
//! [`StationFeed::fetch`] either returns a live snapshot or fails. Falling
//! back to [`StationCache::load`] is left to the caller.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::error::{CacheError, FeedError};
use crate::fetch::{HttpClient, get_json};
use crate::output::write_stations_csv;
use crate::station::{Station, StationSnapshot, parse_stations};

const SNAPSHOT_FILE: &str = "geo_data.json";
const CSV_FILE: &str = "geo_station_live.csv";

#[derive(Debug, Clone)]
pub struct StationCache {
    dir: PathBuf,
}

impl StationCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn json_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.dir.join(CSV_FILE)
    }

    /// Writes the raw feed body and a flat CSV export of the parsed stations.
    pub fn store(&self, body: &[u8], stations: &[Station]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.json_path(), body)?;
        write_stations_csv(&self.csv_path(), stations)?;
        debug!(dir = %self.dir.display(), stations = stations.len(), "Station snapshot cached");
        Ok(())
    }

    /// Loads the last stored snapshot, stamped with the file's modification time.
    pub fn load(&self) -> Result<StationSnapshot, FeedError> {
        let path = self.json_path();
        if !path.exists() {
            return Err(CacheError::NotFound(path.display().to_string()).into());
        }
        let body = fs::read(&path).map_err(CacheError::from)?;
        let taken_at: DateTime<Utc> = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map(DateTime::from)
            .unwrap_or_else(|_| Utc::now());
        let stations = parse_stations(&body)?;
        info!(stations = stations.len(), %taken_at, "Loaded cached station snapshot");
        Ok(StationSnapshot::new(taken_at, stations))
    }
}

/// Live station feed.
pub struct StationFeed<C> {
    client: C,
    url: Url,
    cache: Option<StationCache>,
}

impl<C: HttpClient> StationFeed<C> {
    /// `client` is expected to carry the headers the feed requires (see
    /// [`WithHeaders`](crate::fetch::auth::WithHeaders)).
    pub fn new(client: C, url: Url) -> Self {
        Self {
            client,
            url,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: StationCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[tracing::instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch(&self) -> Result<StationSnapshot, FeedError> {
        let response = get_json(&self.client, self.url.clone()).await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Station feed rejected request");
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let stations = parse_stations(&body)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&body, &stations) {
                warn!(error = %e, "Failed to cache station snapshot");
            }
        }

        info!(stations = stations.len(), "Station feed fetched");
        Ok(StationSnapshot::new(Utc::now(), stations))
    }
}
