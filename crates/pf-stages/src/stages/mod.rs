//! Built-in preparation stages, in pipeline order.

mod demand;
mod grid;
mod pv;
mod sector_coupling;
mod thermal_storage;

pub use demand::DemandStage;
pub use grid::{GRID_COLUMN, GRID_PARAMETERS_FILE, GridStage};
pub use pv::PvStage;
pub use sector_coupling::SectorCouplingStage;
pub use thermal_storage::{STORAGE_COLUMN, ThermalStorageStage};

use crate::error::PipelineError;

/// Wrap a model failure with the stage name.
fn model_error(stage: &'static str) -> impl Fn(String) -> PipelineError {
    move |message| PipelineError::Model { stage, message }
}

/// Series file stem derived from an asset column name.
fn series_stem(column: &str) -> String {
    column.trim().to_lowercase().replace(' ', "_")
}
