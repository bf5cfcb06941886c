use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{RouteLeg, TravelMode, parse_leg};
use crate::error::CacheError;

/// Last successful directions response per travel mode.
///
/// The cache is advisory. Nothing locks the files, so concurrent writers may
/// replace each other's entries.
#[derive(Debug, Clone)]
pub struct RouteCache {
    dir: PathBuf,
}

impl RouteCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, mode: TravelMode) -> PathBuf {
        self.dir
            .join(format!("geo_data_route_{}.json", mode.profile()))
    }

    pub fn store(&self, mode: TravelMode, body: &[u8]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(mode);
        fs::write(&path, body)?;
        debug!(path = %path.display(), bytes = body.len(), "Route leg cached");
        Ok(())
    }

    /// Reads the cached leg for `mode` through the same parser as live
    /// responses.
    pub fn load(&self, mode: TravelMode) -> Result<RouteLeg, CacheError> {
        let path = self.path(mode);
        if !path.exists() {
            return Err(CacheError::NotFound(path.display().to_string()));
        }
        let body = fs::read(&path)?;
        Ok(parse_leg(mode, &body)?)
    }
}
