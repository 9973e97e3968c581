//! Error types for the pf-app service layer.

use std::fmt;
use std::path::PathBuf;

use pf_core::CoreError;
use pf_project::ProjectError;
use pf_results::ResultsError;
use pf_stages::PipelineError;
use pf_weather::WeatherError;

use crate::scenario::RunState;

/// Coarse classification used for reporting and exit handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid inputs, settings or requests.
    Configuration,
    /// A namespace that must be fresh already exists.
    Conflict,
    /// An external collaborator (weather source, engine, model) failed.
    Provider,
    /// Persisted artifacts are missing, malformed or incomplete.
    DataQuality,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Provider => "provider",
            ErrorKind::DataQuality => "data quality",
            ErrorKind::Io => "io",
        };
        f.write_str(s)
    }
}

/// Application error wrapping the backend crates' errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Namespace already exists: {path}")]
    Conflict { path: PathBuf },

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Invalid transition of scenario '{scenario}' from {from} to {to}")]
    InvalidTransition {
        scenario: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("Scenario '{scenario}' failed after reaching {}: {source}", .reached.as_str())]
    ScenarioFailed {
        scenario: String,
        reached: RunState,
        source: Box<AppError>,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Results(#[from] ResultsError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for pf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> AppError {
        let path = path.into();
        move |source| AppError::Io { path, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Configuration(_) | AppError::InvalidTransition { .. } => {
                ErrorKind::Configuration
            }
            AppError::Conflict { .. } => ErrorKind::Conflict,
            AppError::Engine(_) => ErrorKind::Provider,
            AppError::ScenarioFailed { source, .. } => source.kind(),
            AppError::Core(e) => core_kind(e),
            AppError::Project(e) => project_kind(e),
            AppError::Weather(e) => match e {
                WeatherError::Provider { .. } => ErrorKind::Provider,
                WeatherError::Io { .. } => ErrorKind::Io,
                WeatherError::InvalidFile { .. }
                | WeatherError::Csv { .. }
                | WeatherError::Index(_) => ErrorKind::DataQuality,
            },
            AppError::Pipeline(e) => match e {
                PipelineError::OwnershipConflict { .. }
                | PipelineError::UndeclaredWrite { .. }
                | PipelineError::MissingInput { .. } => ErrorKind::Configuration,
                PipelineError::Model { .. } => ErrorKind::Provider,
                PipelineError::Csv { .. } => ErrorKind::DataQuality,
                PipelineError::Io { .. } => ErrorKind::Io,
                PipelineError::Table(e) => core_kind(e),
                PipelineError::Project(e) => project_kind(e),
            },
            AppError::Results(e) => match e {
                ResultsError::Io { .. } => ErrorKind::Io,
                _ => ErrorKind::DataQuality,
            },
            AppError::Io { .. } => ErrorKind::Io,
        }
    }
}

fn core_kind(err: &CoreError) -> ErrorKind {
    match err {
        CoreError::NonFinite { .. } | CoreError::InvalidRange { .. } => ErrorKind::Configuration,
        CoreError::Io { .. } => ErrorKind::Io,
        CoreError::MissingCell { .. }
        | CoreError::NotANumber { .. }
        | CoreError::DuplicateColumn { .. }
        | CoreError::EmptyTable { .. }
        | CoreError::Csv { .. } => ErrorKind::DataQuality,
    }
}

fn project_kind(err: &ProjectError) -> ErrorKind {
    match err {
        ProjectError::Missing { .. }
        | ProjectError::Invalid { .. }
        | ProjectError::SettingsRead { .. }
        | ProjectError::Yaml(_) => ErrorKind::Configuration,
        ProjectError::Table(e) => core_kind(e),
        ProjectError::Io(_) => ErrorKind::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_map_onto_the_taxonomy() {
        let range: AppError = CoreError::InvalidRange {
            what: "empty".to_string(),
        }
        .into();
        assert_eq!(range.kind(), ErrorKind::Configuration);

        let provider: AppError = WeatherError::Provider {
            key: pf_weather::WeatherKey::new(52.5, 13.4, 2017),
            message: "timeout".to_string(),
        }
        .into();
        assert_eq!(provider.kind(), ErrorKind::Provider);

        let missing: AppError = ResultsError::MissingLabel {
            path: PathBuf::from("scalars.csv"),
            label: "Degree of NZE".to_string(),
        }
        .into();
        assert_eq!(missing.kind(), ErrorKind::DataQuality);

        let conflict = AppError::Conflict {
            path: PathBuf::from("outputs/Scenario_A/mvs_outputs"),
        };
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
    }
}
