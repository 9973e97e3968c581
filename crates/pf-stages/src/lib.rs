//! pf-stages: the input preparation pipeline.
//!
//! Stages run in a fixed order against the engine input tables of one
//! scenario. Each stage declares the table columns it writes; a pipeline whose
//! stages claim overlapping columns is rejected when it is built, and a stage
//! writing outside its declaration fails at runtime.
//!
//! The energy models behind the stages are reached through the traits in
//! [`models`]; [`reference`] provides simple deterministic implementations.

pub mod context;
pub mod error;
pub mod models;
pub mod ownership;
pub mod pipeline;
pub mod reference;
pub mod setup;
pub mod stage;
pub mod stages;

pub use context::{DemandOverrides, StageContext, StageInputs, UpdateCounts};
pub use error::{PipelineError, PipelineResult};
pub use models::{DemandModel, HeatPumpModel, PvYieldModel, StageModels, StorageModel};
pub use ownership::{ColumnOwnership, ColumnSelector};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineReport, StageReport};
pub use setup::{PvSetup, read_pv_setup};
pub use stage::{Concern, Stage};
