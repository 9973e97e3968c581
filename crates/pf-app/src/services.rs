//! Collaborators shared by the run and sweep services.

use std::sync::Arc;

use pf_project::Settings;
use pf_stages::{Pipeline, StageModels};
use pf_weather::{
    CommandWeatherProvider, WeatherCache, WeatherError, WeatherKey, WeatherProvider,
    WeatherResult, WeatherSeries,
};

use crate::engine::{CommandEngine, SimulationEngine, UnconfiguredEngine};
use crate::error::AppResult;

/// Weather source used when no provider command is configured.
///
/// Cached years keep working; a cache miss is a provider error.
struct UnconfiguredProvider;

impl WeatherProvider for UnconfiguredProvider {
    fn fetch(&self, key: &WeatherKey) -> WeatherResult<WeatherSeries> {
        Err(WeatherError::Provider {
            key: *key,
            message: "not cached and no weather provider configured".to_string(),
        })
    }
}

#[derive(Clone)]
pub struct Services {
    pub weather: WeatherCache,
    pub engine: Arc<dyn SimulationEngine>,
    pub pipeline: Arc<Pipeline>,
}

impl Services {
    /// Build the configured collaborators with the reference stage models.
    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        let static_dir = settings.paths.static_inputs.clone();
        let provider: Arc<dyn WeatherProvider> = match &settings.weather_provider {
            Some(command) => Arc::new(CommandWeatherProvider::new(command.clone(), static_dir.clone())),
            None => Arc::new(UnconfiguredProvider),
        };
        let engine: Arc<dyn SimulationEngine> = match &settings.engine {
            Some(command) => Arc::new(CommandEngine::new(command.clone())),
            None => Arc::new(UnconfiguredEngine),
        };
        Ok(Self {
            weather: WeatherCache::new(static_dir, provider),
            engine,
            pipeline: Arc::new(Pipeline::standard(&StageModels::reference())?),
        })
    }

    pub fn with_weather_provider(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.weather = WeatherCache::new(self.weather.dir().to_path_buf(), provider);
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn SimulationEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Arc::new(pipeline);
        self
    }
}
