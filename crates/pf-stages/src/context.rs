//! Mutable state shared by the stages of one pipeline run.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pf_core::{CellRef, CellUpdate, LabeledTable, Location, OverwritePolicies, OverwritePolicy};
use pf_project::InputLayout;
use pf_weather::WeatherSeries;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::ownership::ColumnOwnership;
use crate::setup::PvSetup;

/// Precomputed demand series used verbatim instead of the demand model.
#[derive(Debug, Clone, Default)]
pub struct DemandOverrides {
    pub electricity: Option<PathBuf>,
    pub heat: Option<PathBuf>,
}

/// Read-only inputs of a pipeline run.
#[derive(Debug, Clone)]
pub struct StageInputs {
    pub location: Location,
    pub weather: Arc<WeatherSeries>,
    pub storeys: u32,
    pub static_inputs: PathBuf,
    pub user_inputs: PathBuf,
    pub policies: OverwritePolicies,
    pub demand_overrides: DemandOverrides,
    /// Replaces `<user_inputs>/pv_setup.csv` when set.
    pub pv_setup: Option<Vec<PvSetup>>,
}

/// Per-stage tally of cell write outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCounts {
    pub filled: usize,
    pub overwritten: usize,
    pub preserved: usize,
    pub unchanged: usize,
    pub pinned: usize,
}

impl UpdateCounts {
    fn record(&mut self, outcome: CellUpdate) {
        match outcome {
            CellUpdate::Filled => self.filled += 1,
            CellUpdate::Overwritten => self.overwritten += 1,
            CellUpdate::Preserved => self.preserved += 1,
            CellUpdate::Unchanged => self.unchanged += 1,
            CellUpdate::Pinned => self.pinned += 1,
        }
    }

    pub fn writes(&self) -> usize {
        self.filled + self.overwritten
    }
}

/// A `time_series/` file waiting for the run to succeed.
enum PendingSeries {
    Values { header: String, values: Vec<f64> },
    Copy { source: PathBuf },
}

struct ActiveStage {
    name: &'static str,
    writes: Vec<ColumnOwnership>,
    policy: OverwritePolicy,
    counts: UpdateCounts,
}

pub struct StageContext {
    layout: InputLayout,
    inputs: StageInputs,
    tables: BTreeMap<String, LabeledTable>,
    dirty: BTreeSet<String>,
    series: BTreeMap<String, PendingSeries>,
    pins: BTreeSet<(String, CellRef)>,
    active: Option<ActiveStage>,
}

impl StageContext {
    pub fn new(layout: InputLayout, inputs: StageInputs) -> Self {
        Self {
            layout,
            inputs,
            tables: BTreeMap::new(),
            dirty: BTreeSet::new(),
            series: BTreeMap::new(),
            pins: BTreeSet::new(),
            active: None,
        }
    }

    pub fn layout(&self) -> &InputLayout {
        &self.layout
    }

    pub fn inputs(&self) -> &StageInputs {
        &self.inputs
    }

    pub fn location(&self) -> &Location {
        &self.inputs.location
    }

    pub fn weather(&self) -> &WeatherSeries {
        &self.inputs.weather
    }

    /// Protect a cell from every stage regardless of policy.
    pub fn pin(&mut self, table: &str, row: &str, column: &str) {
        self.pins
            .insert((table.to_string(), CellRef::new(row, column)));
    }

    pub fn is_pinned(&self, table: &str, row: &str, column: &str) -> bool {
        self.pins
            .contains(&(table.to_string(), CellRef::new(row, column)))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name) || self.layout.has_table(name)
    }

    pub fn table(&mut self, name: &str) -> PipelineResult<&LabeledTable> {
        Ok(self.load(name)?)
    }

    fn load(&mut self, name: &str) -> PipelineResult<&mut LabeledTable> {
        match self.tables.entry(name.to_string()) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let table = self.layout.read_table(name)?;
                Ok(e.insert(table))
            }
        }
    }

    /// Write a cell under the active stage's policy.
    pub fn set(&mut self, table: &str, row: &str, column: &str, value: &str) -> PipelineResult<CellUpdate> {
        let policy = self
            .active
            .as_ref()
            .map(|a| a.policy)
            .unwrap_or(OverwritePolicy::Preserve);
        self.set_with(table, row, column, value, policy)
    }

    /// Write a cell under an explicit policy.
    ///
    /// The column must be covered by the active stage's ownership declaration.
    pub fn set_with(
        &mut self,
        table: &str,
        row: &str,
        column: &str,
        value: &str,
        policy: OverwritePolicy,
    ) -> PipelineResult<CellUpdate> {
        let stage = match &self.active {
            Some(active) if active.writes.iter().any(|w| w.covers(table, column)) => active.name,
            other => {
                return Err(PipelineError::UndeclaredWrite {
                    stage: other.as_ref().map(|a| a.name).unwrap_or("<no stage>"),
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
        };

        let outcome = if self.is_pinned(table, row, column) {
            CellUpdate::Pinned
        } else {
            let outcome = self.load(table)?.update(row, column, value, policy);
            if outcome.is_write() {
                self.dirty.insert(table.to_string());
            }
            outcome
        };

        debug!(stage, table, row, column, ?outcome, "cell update");
        if let Some(active) = self.active.as_mut() {
            active.counts.record(outcome);
        }
        Ok(outcome)
    }

    /// Point a cell at a time series file and stage the file if the cell now references it.
    pub fn set_series(
        &mut self,
        table: &str,
        row: &str,
        column: &str,
        file_name: &str,
        header: &str,
        values: &[f64],
    ) -> PipelineResult<CellUpdate> {
        let outcome = self.set(table, row, column, file_name)?;
        let path = self.series_path(file_name);
        let references_file = outcome.is_write() || outcome == CellUpdate::Unchanged;
        if references_file && (outcome.is_write() || !path.exists()) {
            self.stage_series(file_name, header, values);
        }
        Ok(outcome)
    }

    pub fn series_path(&self, file_name: &str) -> PathBuf {
        self.layout.time_series().join(file_name)
    }

    /// Stage a single-column series for `time_series/`; written on flush.
    pub fn stage_series(&mut self, file_name: &str, header: &str, values: &[f64]) {
        self.series.insert(
            file_name.to_string(),
            PendingSeries::Values {
                header: header.to_string(),
                values: values.to_vec(),
            },
        );
    }

    /// Stage an external series to be copied into `time_series/` unchanged.
    pub fn stage_copy(&mut self, source: &Path, file_name: &str) -> PipelineResult<()> {
        if !source.is_file() {
            return Err(PipelineError::Io {
                path: source.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "series file not found"),
            });
        }
        self.series.insert(
            file_name.to_string(),
            PendingSeries::Copy {
                source: source.to_path_buf(),
            },
        );
        Ok(())
    }

    /// File names of series staged so far.
    pub fn staged_series(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub(crate) fn begin_stage(
        &mut self,
        name: &'static str,
        writes: Vec<ColumnOwnership>,
        policy: OverwritePolicy,
    ) {
        self.active = Some(ActiveStage {
            name,
            writes,
            policy,
            counts: UpdateCounts::default(),
        });
    }

    pub(crate) fn end_stage(&mut self) -> UpdateCounts {
        self.active
            .take()
            .map(|a| a.counts)
            .unwrap_or_default()
    }

    /// Persist every staged series and modified table.
    pub(crate) fn flush(&mut self) -> PipelineResult<()> {
        if !self.series.is_empty() {
            let dir = self.layout.time_series();
            std::fs::create_dir_all(&dir).map_err(|source| PipelineError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        for (file_name, series) in std::mem::take(&mut self.series) {
            let path = self.series_path(&file_name);
            match series {
                PendingSeries::Values { header, values } => write_series(&path, &header, &values)?,
                PendingSeries::Copy { source } => {
                    std::fs::copy(&source, &path).map_err(|e| PipelineError::Io {
                        path: source.clone(),
                        source: e,
                    })?;
                }
            }
            debug!(path = %path.display(), "series written");
        }
        for name in std::mem::take(&mut self.dirty) {
            if let Some(table) = self.tables.get(&name) {
                self.layout.write_table(table)?;
            }
        }
        Ok(())
    }
}

fn write_series(path: &Path, header: &str, values: &[f64]) -> PipelineResult<()> {
    let csv_err = |source| PipelineError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    wtr.write_record([header]).map_err(csv_err)?;
    for v in values {
        wtr.write_record([v.to_string()]).map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}
