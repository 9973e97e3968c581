//! Boundary to the external optimization engine.

use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use pf_project::CommandSpec;
use pf_results::ResultFiles;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

pub const ENGINE_LOG: &str = "engine.log";

/// Runs one optimization over a prepared input namespace.
///
/// The call blocks until the engine finishes. On success the three result
/// tables exist under `output`.
pub trait SimulationEngine: Send + Sync {
    fn run(&self, input: &Path, output: &Path, overwrite: bool) -> AppResult<ResultFiles>;
}

/// Spawns the configured engine program.
///
/// Invocation: `<program> <args..> -i <input> -o <output> -f csv [--overwrite]`,
/// stdout and stderr go to `<output>/engine.log`.
pub struct CommandEngine {
    command: CommandSpec,
}

impl CommandEngine {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

impl SimulationEngine for CommandEngine {
    fn run(&self, input: &Path, output: &Path, overwrite: bool) -> AppResult<ResultFiles> {
        std::fs::create_dir_all(output).map_err(AppError::io(output))?;
        let log_path = output.join(ENGINE_LOG);
        let log = File::create(&log_path).map_err(AppError::io(&log_path))?;
        let log_err = log.try_clone().map_err(AppError::io(&log_path))?;

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .arg("-f")
            .arg("csv")
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));
        if overwrite {
            cmd.arg("--overwrite");
        }

        info!(program = %self.command.program, input = %input.display(), output = %output.display(), "running engine");
        let status = cmd.status().map_err(|e| {
            AppError::Engine(format!("failed to start '{}': {e}", self.command.program))
        })?;
        if !status.success() {
            warn!(%status, log = %log_path.display(), "engine failed");
            return Err(AppError::Engine(format!(
                "'{}' exited with {status}, see {}",
                self.command.program,
                log_path.display()
            )));
        }

        locate_results(output)
    }
}

/// Engine used when no engine command is configured.
pub struct UnconfiguredEngine;

impl SimulationEngine for UnconfiguredEngine {
    fn run(&self, _input: &Path, _output: &Path, _overwrite: bool) -> AppResult<ResultFiles> {
        Err(AppError::Configuration(
            "no engine command configured (settings key 'engine')".to_string(),
        ))
    }
}

/// Result tables missing after a successful exit are an engine failure.
pub fn locate_results(output: &Path) -> AppResult<ResultFiles> {
    ResultFiles::locate(output).map_err(|e| AppError::Engine(format!("incomplete results: {e}")))
}
