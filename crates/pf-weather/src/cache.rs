//! Memoizing weather cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::index::{IndexEntry, WeatherIndex, fingerprint};
use crate::provider::WeatherProvider;
use crate::series::{WeatherKey, WeatherSeries};
use crate::{WeatherError, WeatherResult};

/// Weather cache rooted in the static inputs directory.
///
/// There is no locking: two concurrent misses for the same key may both call
/// the provider. Populate the cache before fanning out work in parallel.
#[derive(Clone)]
pub struct WeatherCache {
    dir: PathBuf,
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherCache {
    pub fn new(dir: impl Into<PathBuf>, provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            dir: dir.into(),
            provider,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &WeatherKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    fn partial_path_for(&self, key: &WeatherKey) -> PathBuf {
        self.dir.join(format!("{}.partial", key.file_name()))
    }

    pub fn contains(&self, key: &WeatherKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Resolve the series for `key`.
    ///
    /// An `override_path` is read verbatim and bypasses the cache entirely.
    /// Provider errors are returned as-is; there is no retry.
    pub fn resolve(
        &self,
        key: WeatherKey,
        override_path: Option<&Path>,
    ) -> WeatherResult<Arc<WeatherSeries>> {
        if let Some(path) = override_path {
            info!(path = %path.display(), "using weather override file");
            return Ok(Arc::new(WeatherSeries::read_csv(path, key)?));
        }

        let path = self.path_for(&key);
        if path.is_file() {
            debug!(path = %path.display(), "weather cache hit");
            return Ok(Arc::new(WeatherSeries::read_csv(&path, key)?));
        }

        info!(%key, "weather cache miss, fetching from provider");
        let series = self.provider.fetch(&key)?;
        std::fs::create_dir_all(&self.dir).map_err(WeatherError::io(&self.dir))?;
        // Only a complete file may appear under the cache name.
        let partial = self.partial_path_for(&key);
        series.write_csv(&partial)?;
        std::fs::rename(&partial, &path).map_err(WeatherError::io(&path))?;
        self.record_in_index(&key, &path)?;

        Ok(Arc::new(series))
    }

    /// Cached years for a location, read from the sidecar index.
    pub fn cached_years(&self, latitude: f64, longitude: f64) -> WeatherResult<Vec<i32>> {
        Ok(WeatherIndex::load(&self.dir)?.years_for(latitude, longitude))
    }

    fn record_in_index(&self, key: &WeatherKey, path: &Path) -> WeatherResult<()> {
        let mut index = WeatherIndex::load(&self.dir)?;
        index.record(IndexEntry {
            latitude: key.latitude,
            longitude: key.longitude,
            year: key.year,
            file: key.file_name(),
            sha256: fingerprint(path)?,
        });
        index.save(&self.dir)
    }
}
