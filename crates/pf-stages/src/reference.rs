//! Simple deterministic models.
//!
//! These keep the pipeline runnable without external model packages. They are
//! plausible in shape only and make no claim of physical accuracy.

use chrono::Timelike;
use pf_core::Location;
use pf_weather::WeatherSeries;

use crate::models::{DemandModel, HeatPumpModel, ModelResult, PvYieldModel, StorageModel};
use crate::setup::PvSetup;

const KELVIN: f64 = 273.15;

/// Irradiance-proportional PV yield with a temperature derate.
#[derive(Debug, Clone)]
pub struct ReferencePv {
    /// Module power per m² of usable surface, kWp/m².
    pub kwp_per_m2: f64,
    /// Usable surface per storey for facades, m².
    pub facade_area_per_storey: f64,
    /// Usable roof surface, m².
    pub roof_area: f64,
    /// Relative power loss per K above 25 °C.
    pub temp_coefficient: f64,
}

impl Default for ReferencePv {
    fn default() -> Self {
        Self {
            kwp_per_m2: 0.17,
            facade_area_per_storey: 40.0,
            roof_area: 400.0,
            temp_coefficient: 0.004,
        }
    }
}

impl ReferencePv {
    fn technology_factor(technology: &str) -> ModelResult<f64> {
        match technology {
            "si" => Ok(1.0),
            "psi" => Ok(1.1),
            "cpv" => Ok(1.3),
            other => Err(format!("unknown PV technology '{other}'")),
        }
    }
}

impl PvYieldModel for ReferencePv {
    fn normalized_feedin(
        &self,
        setup: &PvSetup,
        weather: &WeatherSeries,
        _location: &Location,
    ) -> ModelResult<Vec<f64>> {
        let tech = Self::technology_factor(&setup.technology)?;
        // Vertical surfaces (tilt 0) see roughly 70 % of horizontal irradiance.
        let orientation = 0.7 + 0.3 * (setup.surface_tilt.clamp(0.0, 90.0) / 90.0);
        Ok(weather
            .records()
            .iter()
            .map(|r| {
                let derate = 1.0 - self.temp_coefficient * (r.temp_air - 25.0).max(0.0);
                (r.ghi / 1000.0 * orientation * tech * derate).clamp(0.0, 1.0)
            })
            .collect())
    }

    fn maximum_capacity(&self, setup: &PvSetup, storeys: u32) -> ModelResult<f64> {
        let area = if setup.surface_type.ends_with("roof") {
            self.roof_area
        } else {
            self.facade_area_per_storey * f64::from(storeys)
        };
        Ok(area * self.kwp_per_m2)
    }
}

/// Carnot COP scaled by a quality grade.
#[derive(Debug, Clone)]
pub struct ReferenceHeatPump {
    pub supply_temp_c: f64,
    pub quality_grade: f64,
}

impl Default for ReferenceHeatPump {
    fn default() -> Self {
        Self {
            supply_temp_c: 55.0,
            quality_grade: 0.4,
        }
    }
}

impl HeatPumpModel for ReferenceHeatPump {
    fn cop(&self, weather: &WeatherSeries) -> ModelResult<Vec<f64>> {
        let t_high = self.supply_temp_c + KELVIN;
        Ok(weather
            .temp_air()
            .map(|t| {
                let lift = (self.supply_temp_c - t).max(1.0);
                (self.quality_grade * t_high / lift).clamp(1.0, 7.0)
            })
            .collect())
    }
}

/// Daily-shaped electricity load and heating degree-hour heat load.
#[derive(Debug, Clone)]
pub struct ReferenceDemand {
    pub electricity_kw_per_storey: f64,
    pub heat_kw_per_storey_k: f64,
    pub heating_limit_c: f64,
}

impl Default for ReferenceDemand {
    fn default() -> Self {
        Self {
            electricity_kw_per_storey: 2.5,
            heat_kw_per_storey_k: 0.4,
            heating_limit_c: 15.0,
        }
    }
}

impl DemandModel for ReferenceDemand {
    fn electricity(&self, _location: &Location, storeys: u32, weather: &WeatherSeries) -> ModelResult<Vec<f64>> {
        let base = self.electricity_kw_per_storey * f64::from(storeys);
        Ok(weather
            .times()
            .map(|t| {
                let shape = match t.hour() {
                    0..=5 => 0.5,
                    6..=8 | 18..=21 => 1.4,
                    _ => 1.0,
                };
                base * shape
            })
            .collect())
    }

    fn heat(&self, _location: &Location, storeys: u32, weather: &WeatherSeries) -> ModelResult<Vec<f64>> {
        let per_k = self.heat_kw_per_storey_k * f64::from(storeys);
        Ok(weather
            .temp_air()
            .map(|t| (self.heating_limit_c - t).max(0.0) * per_k)
            .collect())
    }
}

/// Losses proportional to the storage-to-ambient temperature difference.
#[derive(Debug, Clone)]
pub struct ReferenceStorage {
    pub storage_temp_c: f64,
    pub relative_per_k: f64,
    pub absolute_per_k: f64,
}

impl Default for ReferenceStorage {
    fn default() -> Self {
        Self {
            storage_temp_c: 60.0,
            relative_per_k: 0.000_03,
            absolute_per_k: 0.000_5,
        }
    }
}

impl StorageModel for ReferenceStorage {
    fn losses_relative(&self, weather: &WeatherSeries) -> ModelResult<Vec<f64>> {
        Ok(weather
            .temp_air()
            .map(|t| (self.storage_temp_c - t).max(0.0) * self.relative_per_k)
            .collect())
    }

    fn losses_absolute(&self, weather: &WeatherSeries) -> ModelResult<Vec<f64>> {
        Ok(weather
            .temp_air()
            .map(|t| (self.storage_temp_c - t).max(0.0) * self.absolute_per_k)
            .collect())
    }
}
