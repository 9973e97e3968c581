use std::path::PathBuf;

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid range: {what}")]
    InvalidRange { what: String },

    #[error("Table {table}: no cell at row '{row}', column '{column}'")]
    MissingCell {
        table: String,
        row: String,
        column: String,
    },

    #[error("Table {table}: cell ({row}, {column}) is not a number: '{value}'")]
    NotANumber {
        table: String,
        row: String,
        column: String,
        value: String,
    },

    #[error("Table {table}: duplicate column '{column}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Table file {path} has no header row")]
    EmptyTable { path: PathBuf },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
