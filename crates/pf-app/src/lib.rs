//! Service layer for pvflow.
//!
//! Wires the location resolver, weather cache, stage pipeline, scenario
//! manager and engine boundary into the single-scenario run and the
//! parameter sweep. Frontends only talk to this crate.

pub mod engine;
pub mod error;
pub mod progress;
pub mod run_service;
pub mod scenario;
pub mod services;
pub mod sweep;

pub use engine::{CommandEngine, ENGINE_LOG, SimulationEngine, UnconfiguredEngine, locate_results};
pub use error::{AppError, AppResult, ErrorKind};
pub use progress::{ProgressCallback, ProgressEvent, RunStage, SweepProgress};
pub use run_service::{PrepareResponse, RunRequest, RunResponse, RunTiming, prepare, run_pipeline};
pub use scenario::{RunState, ScenarioManager, ScenarioNamespace, ScenarioRun};
pub use services::Services;
pub use sweep::{StepOutcome, SweepReport, SweepRequest, run_sweep};
