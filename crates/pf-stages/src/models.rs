//! Model boundaries used by the stages.
//!
//! The stages only orchestrate; numbers come from these traits.

use std::sync::Arc;

use pf_core::Location;
use pf_weather::WeatherSeries;

use crate::reference::{ReferenceDemand, ReferenceHeatPump, ReferencePv, ReferenceStorage};
use crate::setup::PvSetup;

pub type ModelResult<T> = Result<T, String>;

pub trait PvYieldModel: Send + Sync {
    /// Feed-in per kWp installed, one value per weather record.
    fn normalized_feedin(
        &self,
        setup: &PvSetup,
        weather: &WeatherSeries,
        location: &Location,
    ) -> ModelResult<Vec<f64>>;

    /// Installable capacity in kWp for the building.
    fn maximum_capacity(&self, setup: &PvSetup, storeys: u32) -> ModelResult<f64>;
}

pub trait HeatPumpModel: Send + Sync {
    /// Coefficient of performance per weather record.
    fn cop(&self, weather: &WeatherSeries) -> ModelResult<Vec<f64>>;
}

pub trait DemandModel: Send + Sync {
    /// Electricity demand in kW per weather record.
    fn electricity(&self, location: &Location, storeys: u32, weather: &WeatherSeries) -> ModelResult<Vec<f64>>;

    /// Heat demand in kW per weather record.
    fn heat(&self, location: &Location, storeys: u32, weather: &WeatherSeries) -> ModelResult<Vec<f64>>;
}

pub trait StorageModel: Send + Sync {
    /// Relative thermal losses per weather record.
    fn losses_relative(&self, weather: &WeatherSeries) -> ModelResult<Vec<f64>>;

    /// Absolute thermal losses in kWh per time step.
    fn losses_absolute(&self, weather: &WeatherSeries) -> ModelResult<Vec<f64>>;
}

/// The model set handed to the standard pipeline.
#[derive(Clone)]
pub struct StageModels {
    pub pv: Arc<dyn PvYieldModel>,
    pub heat_pump: Arc<dyn HeatPumpModel>,
    pub demand: Arc<dyn DemandModel>,
    pub storage: Arc<dyn StorageModel>,
}

impl StageModels {
    pub fn reference() -> Self {
        Self {
            pv: Arc::new(ReferencePv::default()),
            heat_pump: Arc::new(ReferenceHeatPump::default()),
            demand: Arc::new(ReferenceDemand::default()),
            storage: Arc::new(ReferenceStorage::default()),
        }
    }
}

impl Default for StageModels {
    fn default() -> Self {
        Self::reference()
    }
}
