//! pf-project: settings, input/output layout, and project metadata.

pub mod layout;
pub mod metadata;
pub mod resolve;
pub mod settings;

pub use layout::{InputLayout, OutputLayout, tables};
pub use metadata::ProjectMetadata;
pub use resolve::{LocationRequest, resolve_location};
pub use settings::{CommandSpec, DefaultLocation, PathSettings, Settings, SettingsOverrides};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Missing configuration: {what}")]
    Missing { what: String },

    #[error("Invalid configuration: {what}")]
    Invalid { what: String },

    #[error("Failed to read settings file {path}: {source}")]
    SettingsRead {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Table(#[from] pf_core::CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
