//! Pipeline errors.

use std::path::PathBuf;

use crate::ownership::ColumnSelector;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(
        "Stages '{first}' and '{second}' both write {table}: {first_selector} overlaps {second_selector}"
    )]
    OwnershipConflict {
        first: &'static str,
        second: &'static str,
        table: String,
        first_selector: ColumnSelector,
        second_selector: ColumnSelector,
    },

    #[error("Stage '{stage}' wrote undeclared column '{column}' of {table}")]
    UndeclaredWrite {
        stage: &'static str,
        table: String,
        column: String,
    },

    #[error("Stage '{stage}' is missing input: {what}")]
    MissingInput { stage: &'static str, what: String },

    #[error("Stage '{stage}' model failed: {message}")]
    Model { stage: &'static str, message: String },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Table(#[from] pf_core::CoreError),

    #[error(transparent)]
    Project(#[from] pf_project::ProjectError),
}
