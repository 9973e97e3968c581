//! pf-weather: weather series, provider boundary, and the on-disk weather cache.
//!
//! The cache key is a pure function of (latitude, longitude, year). Entries are
//! never invalidated; once a file exists it is trusted for every later run that
//! shares the static inputs directory.

pub mod cache;
pub mod index;
pub mod provider;
pub mod series;
pub mod summary;

pub use cache::WeatherCache;
pub use index::{IndexEntry, WeatherIndex};
pub use provider::{CommandWeatherProvider, WeatherProvider};
pub use series::{WeatherKey, WeatherRecord, WeatherSeries};
pub use summary::{YearSummary, summarize_years};

use std::path::PathBuf;

pub type WeatherResult<T> = Result<T, WeatherError>;

#[derive(thiserror::Error, Debug)]
pub enum WeatherError {
    #[error("Weather provider failed for {key}: {message}")]
    Provider { key: WeatherKey, message: String },

    #[error("Weather file {path} is invalid: {message}")]
    InvalidFile { path: PathBuf, message: String },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("Weather index error: {0}")]
    Index(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl WeatherError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> WeatherError {
        let path = path.into();
        move |source| WeatherError::Io { path, source }
    }
}
