//! Sidecar manifest describing every step of a sweep.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ResultsError, ResultsResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestStep {
    pub year: i32,
    /// Position of the value in the sweep range.
    pub index: usize,
    pub value: f64,
    /// `<year>_<value>` as used in directory and file names.
    pub label: String,
    /// Step namespace, relative to the scenario directory.
    pub namespace: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepManifest {
    pub scenario: String,
    pub variable: String,
    pub table: String,
    pub column: String,
    pub created_at: DateTime<Utc>,
    pub steps: Vec<ManifestStep>,
}

impl SweepManifest {
    pub fn load(path: &Path) -> ResultsResult<Self> {
        if !path.is_file() {
            return Err(ResultsError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> ResultsResult<()> {
        let io_err = |source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(io_err)
    }

    pub fn step(&self, label: &str) -> Option<&ManifestStep> {
        self.steps.iter().find(|s| s.label == label)
    }

    pub fn step_mut(&mut self, label: &str) -> Option<&mut ManifestStep> {
        self.steps.iter_mut().find(|s| s.label == label)
    }

    /// Merge `steps` into the manifest, keyed by label.
    ///
    /// A step that already succeeded is never replaced. Afterwards the steps
    /// are ordered by (year, value) and `index` counts values within a year.
    pub fn merge(&mut self, steps: impl IntoIterator<Item = ManifestStep>) {
        for step in steps {
            match self.step_mut(&step.label) {
                Some(existing) if existing.status == StepStatus::Succeeded => {}
                Some(existing) => *existing = step,
                None => self.steps.push(step),
            }
        }
        self.steps
            .sort_by(|a, b| a.year.cmp(&b.year).then(a.value.total_cmp(&b.value)));
        let mut year = None;
        let mut next = 0;
        for step in &mut self.steps {
            if year != Some(step.year) {
                year = Some(step.year);
                next = 0;
            }
            step.index = next;
            next += 1;
        }
    }

    pub fn succeeded(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Succeeded)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_json_shape() {
        let manifest = SweepManifest {
            scenario: "Scenario_A".to_string(),
            variable: "lifetime".to_string(),
            table: "energyProduction".to_string(),
            column: "PV si".to_string(),
            created_at: Utc::now(),
            steps: vec![ManifestStep {
                year: 2017,
                index: 0,
                value: 5.0,
                label: "2017_5".to_string(),
                namespace: "mvs_outputs_loop_lifetime_2017_5".to_string(),
                status: StepStatus::Failed,
                error: Some("engine exited with status 1".to_string()),
            }],
        };

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["steps"][0]["status"], "failed");
        let back: SweepManifest = serde_json::from_value(json).unwrap();
        assert_eq!(back, manifest);
        assert_eq!(back.failed(), 1);
    }

    fn step(year: i32, value: f64, status: StepStatus) -> ManifestStep {
        ManifestStep {
            year,
            index: 0,
            value,
            label: format!("{year}_{value}"),
            namespace: format!("mvs_outputs_loop_lifetime_{year}_{value}"),
            status,
            error: None,
        }
    }

    #[test]
    fn merge_keeps_succeeded_steps_and_reindexes() {
        let mut manifest = SweepManifest {
            scenario: "Scenario_A".to_string(),
            variable: "lifetime".to_string(),
            table: "energyProduction".to_string(),
            column: "PV si".to_string(),
            created_at: Utc::now(),
            steps: vec![
                step(2017, 5.0, StepStatus::Succeeded),
                step(2017, 6.0, StepStatus::Failed),
            ],
        };

        manifest.merge(vec![
            step(2017, 7.0, StepStatus::Pending),
            step(2017, 5.0, StepStatus::Pending),
            step(2017, 6.0, StepStatus::Pending),
            step(2016, 9.0, StepStatus::Pending),
        ]);

        let keys: Vec<_> = manifest
            .steps
            .iter()
            .map(|s| (s.year, s.index, s.value, s.status))
            .collect();
        assert_eq!(
            keys,
            vec![
                (2016, 0, 9.0, StepStatus::Pending),
                (2017, 0, 5.0, StepStatus::Succeeded),
                (2017, 1, 6.0, StepStatus::Pending),
                (2017, 2, 7.0, StepStatus::Pending),
            ]
        );
    }
}
