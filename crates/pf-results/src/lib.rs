//! pf-results: engine result tables, sweep manifests and KPI aggregation.

pub mod aggregate;
pub mod files;
pub mod kpi;
pub mod manifest;

pub use aggregate::{aggregate_scenarios, aggregate_sweep, write_scenarios_csv};
pub use files::{AssetMatrix, COST_MATRIX, ResultFiles, SCALAR_MATRIX, SCALARS, ScalarTable};
pub use kpi::{KpiMetric, KpiRow, KpiTable};
pub use manifest::{ManifestStep, StepStatus, SweepManifest};

use std::path::PathBuf;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("Result file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("Label '{label}' not found in {path}")]
    MissingLabel { path: PathBuf, label: String },

    #[error("Value '{value}' for '{label}' in {path} is not a number")]
    NotANumber {
        path: PathBuf,
        label: String,
        value: String,
    },

    #[error("Sweep step {label} did not succeed: {reason}")]
    StepFailed { label: String, reason: String },

    #[error("No PV assets declared in {path}")]
    NoPvAssets { path: PathBuf },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Table(#[from] pf_core::CoreError),
}
