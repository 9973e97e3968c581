//! Scenario output namespaces and run lifecycle.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use pf_project::OutputLayout;
use pf_project::layout::MVS_OUTPUTS;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

/// An allocated output namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioNamespace {
    pub name: String,
    /// `outputs/<name>`
    pub dir: PathBuf,
    /// The fresh directory the engine writes into.
    pub engine_outputs: PathBuf,
}

/// Allocates output namespaces under the outputs root.
///
/// Allocation never merges: a namespace that already exists is a conflict and
/// the existing directory is left untouched.
#[derive(Debug, Clone)]
pub struct ScenarioManager {
    outputs: OutputLayout,
}

impl ScenarioManager {
    pub fn new(outputs: OutputLayout) -> Self {
        Self { outputs }
    }

    pub fn outputs(&self) -> &OutputLayout {
        &self.outputs
    }

    /// Create `outputs/<name>/mvs_outputs`.
    pub fn allocate(&self, name: &str) -> AppResult<ScenarioNamespace> {
        validate_name(name)?;
        let dir = self.outputs.scenario_dir(name);
        let engine_outputs = self.outputs.mvs_outputs(name);
        create_fresh(&dir, &engine_outputs)?;
        info!(scenario = name, path = %engine_outputs.display(), "scenario allocated");
        Ok(ScenarioNamespace {
            name: name.to_string(),
            dir,
            engine_outputs,
        })
    }

    /// Create `outputs/<scenario>/<child>` for one sweep step.
    pub fn allocate_nested(&self, scenario: &str, child: &str) -> AppResult<ScenarioNamespace> {
        validate_name(scenario)?;
        validate_name(child)?;
        let dir = self.outputs.scenario_dir(scenario);
        let engine_outputs = dir.join(child);
        create_fresh(&dir, &engine_outputs)?;
        debug!(scenario, namespace = child, "step namespace allocated");
        Ok(ScenarioNamespace {
            name: scenario.to_string(),
            dir,
            engine_outputs,
        })
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name == MVS_OUTPUTS;
    if invalid {
        return Err(AppError::Configuration(format!(
            "invalid scenario name '{name}'"
        )));
    }
    Ok(())
}

fn create_fresh(parent: &Path, dir: &Path) -> AppResult<()> {
    std::fs::create_dir_all(parent).map_err(AppError::io(parent))?;
    match std::fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == IoErrorKind::AlreadyExists => Err(AppError::Conflict {
            path: dir.to_path_buf(),
        }),
        Err(e) => Err(AppError::Io {
            path: dir.to_path_buf(),
            source: e,
        }),
    }
}

/// Lifecycle of one scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Prepared,
    Simulated,
    Complete,
    Failed,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Prepared => "prepared",
            RunState::Simulated => "simulated",
            RunState::Complete => "complete",
            RunState::Failed => "failed",
        }
    }

    fn can_move_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Pending, RunState::Prepared)
                | (RunState::Prepared, RunState::Simulated)
                | (RunState::Simulated, RunState::Complete)
                | (RunState::Pending | RunState::Prepared | RunState::Simulated, RunState::Failed)
        )
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioRun {
    name: String,
    state: RunState,
    failure: Option<String>,
}

impl ScenarioRun {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RunState::Pending,
            failure: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn advance(&mut self, next: RunState) -> AppResult<()> {
        if !self.state.can_move_to(next) {
            return Err(AppError::InvalidTransition {
                scenario: self.name.clone(),
                from: self.state.as_str(),
                to: next.as_str(),
            });
        }
        debug!(scenario = %self.name, from = self.state.as_str(), to = next.as_str(), "run state");
        self.state = next;
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> AppResult<()> {
        self.advance(RunState::Failed)?;
        self.failure = Some(reason.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pf_app_scenario_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn second_allocation_conflicts_and_keeps_contents() {
        let manager = ScenarioManager::new(OutputLayout::new(scratch("conflict")));
        let ns = manager.allocate("Scenario_A").unwrap();
        let marker = ns.engine_outputs.join("scalars.csv");
        std::fs::write(&marker, ",0\nRenewable factor,0.3\n").unwrap();

        let err = manager.allocate("Scenario_A").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            std::fs::read_to_string(&marker).unwrap(),
            ",0\nRenewable factor,0.3\n"
        );
    }

    #[test]
    fn names_with_separators_are_rejected() {
        let manager = ScenarioManager::new(OutputLayout::new(scratch("names")));
        for name in ["", "..", "a/b", "a\\b"] {
            let err = manager.allocate(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{name:?}");
        }
    }

    #[test]
    fn nested_namespaces_share_the_scenario_dir() {
        let manager = ScenarioManager::new(OutputLayout::new(scratch("nested")));
        let a = manager
            .allocate_nested("Scenario_A", "mvs_outputs_loop_lifetime_2017_5")
            .unwrap();
        let b = manager
            .allocate_nested("Scenario_A", "mvs_outputs_loop_lifetime_2017_6")
            .unwrap();
        assert_eq!(a.dir, b.dir);
        assert!(manager
            .allocate_nested("Scenario_A", "mvs_outputs_loop_lifetime_2017_5")
            .is_err());
    }

    #[test]
    fn run_state_transitions() {
        let mut run = ScenarioRun::new("Scenario_A");
        assert!(run.advance(RunState::Simulated).is_err());
        run.advance(RunState::Prepared).unwrap();
        run.advance(RunState::Simulated).unwrap();
        run.advance(RunState::Complete).unwrap();
        assert!(run.fail("late").is_err());

        let mut failed = ScenarioRun::new("Scenario_B");
        failed.fail("weather provider down").unwrap();
        assert_eq!(failed.state(), RunState::Failed);
        assert_eq!(failed.failure(), Some("weather provider down"));
    }
}
