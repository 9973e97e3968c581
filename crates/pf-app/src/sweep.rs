//! Parameter sweeps over one table cell and a list of years.
//!
//! Every (year, value) pair gets its own namespace
//! `outputs/<scenario>/mvs_outputs_loop_<variable>_<year>_<value>` holding a
//! copy of the base inputs with the target cell set. Steps are independent and
//! run on a bounded rayon pool; a failing step is recorded and the sweep goes on.
//!
//! Rerunning or extending a sweep merges into its manifest: steps that already
//! succeeded are skipped and keep their results.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use chrono::Utc;
use pf_core::{Location, arange, format_step_value};
use pf_project::layout::STEP_INPUTS;
use pf_project::{InputLayout, LocationRequest, OutputLayout, ProjectMetadata, Settings, resolve_location};
use pf_results::{ManifestStep, StepStatus, SweepManifest};
use pf_stages::{DemandOverrides, StageContext};
use pf_weather::WeatherSeries;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::progress::{ProgressCallback, RunStage, SweepProgress, emit};
use crate::run_service::{stage_inputs, weather_key};
use crate::scenario::ScenarioManager;
use crate::services::Services;

/// What to vary and over which values.
#[derive(Debug, Clone)]
pub struct SweepRequest {
    pub scenario: String,
    /// Row label of the target cell, e.g. `lifetime`.
    pub variable: String,
    /// Target table stem, e.g. `energyProduction`.
    pub table: String,
    /// Target column, e.g. `PV si`.
    pub column: String,
    pub start: f64,
    /// Exclusive.
    pub stop: f64,
    pub step: f64,
    pub years: Vec<i32>,
    pub location: LocationRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub year: i32,
    pub index: usize,
    pub value: f64,
    pub namespace: PathBuf,
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn label(&self) -> String {
        format!("{}_{}", self.year, format_step_value(self.value))
    }
}

#[derive(Debug, Clone)]
pub struct SweepReport {
    pub scenario: String,
    pub variable: String,
    /// Steps run by this call, ordered by (year, value).
    pub steps: Vec<StepOutcome>,
    /// Labels of requested steps that had already succeeded and were not rerun.
    pub skipped: Vec<String>,
    pub manifest: PathBuf,
}

impl SweepReport {
    pub fn succeeded(&self) -> usize {
        self.steps.iter().filter(|s| s.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.steps.len() - self.succeeded()
    }
}

#[derive(Debug, Clone, Copy)]
struct StepUnit {
    year: i32,
    index: usize,
    value: f64,
}

impl StepUnit {
    fn label(&self) -> String {
        format!("{}_{}", self.year, format_step_value(self.value))
    }
}

/// Everything a step needs, shared read-only across workers.
struct SweepPlan<'a> {
    settings: &'a Settings,
    services: &'a Services,
    request: &'a SweepRequest,
    base: InputLayout,
    outputs: OutputLayout,
    manager: ScenarioManager,
    location: Location,
    weather: BTreeMap<i32, Arc<WeatherSeries>>,
}

pub fn run_sweep(
    settings: &Settings,
    services: &Services,
    request: &SweepRequest,
    progress_cb: Option<ProgressCallback<'_>>,
) -> AppResult<SweepReport> {
    let started = Instant::now();
    settings.validate()?;
    validate(request)?;
    let values = arange(request.start, request.stop, request.step)?;

    let base = settings.input_layout();
    let target = base.read_table(&request.table)?;
    if !target.has_column(&request.column) {
        return Err(AppError::Configuration(format!(
            "table '{}' has no column '{}'",
            request.table, request.column
        )));
    }
    if !target.has_row(&request.variable) {
        return Err(AppError::Configuration(format!(
            "table '{}' has no row '{}'",
            request.table, request.variable
        )));
    }

    let outputs = settings.output_layout();
    let manifest_path = outputs.sweep_manifest(&request.scenario, &request.variable);
    let mut manifest = existing_manifest(&manifest_path, request)?;

    emit(progress_cb, RunStage::ResolvingLocation, started, None, None);
    let mut location_request = request.location.clone();
    location_request.year = location_request.year.or(request.years.first().copied());
    let location = resolve_location(settings, &base, &location_request)?;

    // Populate the cache before fan-out; concurrent misses would double-fetch.
    emit(progress_cb, RunStage::ResolvingWeather, started, None, None);
    let mut weather = BTreeMap::new();
    for &year in &request.years {
        let series = services.weather.resolve(weather_key(&location.with_year(year)), None)?;
        weather.insert(year, series);
    }

    let (units, skipped): (Vec<StepUnit>, Vec<StepUnit>) = request
        .years
        .iter()
        .flat_map(|&year| {
            values
                .iter()
                .enumerate()
                .map(move |(index, &value)| StepUnit { year, index, value })
        })
        .partition(|u| {
            manifest
                .step(&u.label())
                .is_none_or(|s| s.status != StepStatus::Succeeded)
        });
    for unit in &skipped {
        info!(step = %unit.label(), "step already succeeded, skipping");
    }

    manifest.merge(units.iter().map(|u| ManifestStep {
        year: u.year,
        index: u.index,
        value: u.value,
        label: u.label(),
        namespace: OutputLayout::loop_namespace_name(&request.variable, u.year, u.value),
        status: StepStatus::Pending,
        error: None,
    }));
    manifest.save(&manifest_path)?;

    let plan = SweepPlan {
        settings,
        services,
        request,
        base,
        manager: ScenarioManager::new(outputs.clone()),
        outputs,
        location,
        weather,
    };

    info!(
        scenario = %request.scenario,
        variable = %request.variable,
        steps = units.len(),
        workers = settings.max_workers,
        "starting sweep"
    );
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.max_workers)
        .build()
        .map_err(|e| AppError::Configuration(format!("cannot build worker pool: {e}")))?;

    let total = units.len();
    let completed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let steps: Vec<StepOutcome> = pool.install(|| {
        units
            .par_iter()
            .map(|unit| {
                let result = run_step(&plan, unit);
                if let Err(e) = &result {
                    warn!(year = unit.year, value = unit.value, error = %e, "sweep step failed");
                    failed.fetch_add(1, Ordering::SeqCst);
                }
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                emit(
                    progress_cb,
                    RunStage::RunningEngine,
                    started,
                    None,
                    Some(SweepProgress {
                        completed: done,
                        failed: failed.load(Ordering::SeqCst),
                        total,
                    }),
                );
                StepOutcome {
                    year: unit.year,
                    index: unit.index,
                    value: unit.value,
                    namespace: plan.outputs.loop_namespace(
                        &request.scenario,
                        &request.variable,
                        unit.year,
                        unit.value,
                    ),
                    error: result.err().map(|e| e.to_string()),
                }
            })
            .collect()
    });

    for outcome in &steps {
        if let Some(entry) = manifest.step_mut(&outcome.label()) {
            entry.status = if outcome.succeeded() {
                StepStatus::Succeeded
            } else {
                StepStatus::Failed
            };
            entry.error = outcome.error.clone();
        }
    }
    manifest.save(&manifest_path)?;

    let report = SweepReport {
        scenario: request.scenario.clone(),
        variable: request.variable.clone(),
        steps,
        skipped: skipped.iter().map(StepUnit::label).collect(),
        manifest: manifest_path,
    };
    emit(
        progress_cb,
        RunStage::Completed,
        started,
        Some(format!("{} of {total} steps succeeded", report.succeeded())),
        None,
    );
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        elapsed_s = started.elapsed().as_secs_f64(),
        "sweep finished"
    );
    Ok(report)
}

/// The sweep's manifest so far, or a fresh one.
///
/// A manifest recorded for a different target cell is a configuration error.
fn existing_manifest(path: &Path, request: &SweepRequest) -> AppResult<SweepManifest> {
    if !path.is_file() {
        return Ok(SweepManifest {
            scenario: request.scenario.clone(),
            variable: request.variable.clone(),
            table: request.table.clone(),
            column: request.column.clone(),
            created_at: Utc::now(),
            steps: Vec::new(),
        });
    }
    let manifest = SweepManifest::load(path)?;
    if manifest.table != request.table || manifest.column != request.column {
        return Err(AppError::Configuration(format!(
            "sweep '{}' was recorded for {}/{}, not {}/{}",
            request.variable, manifest.table, manifest.column, request.table, request.column
        )));
    }
    debug!(path = %path.display(), steps = manifest.steps.len(), "extending existing sweep manifest");
    Ok(manifest)
}

fn validate(request: &SweepRequest) -> AppResult<()> {
    for (what, value) in [
        ("variable", &request.variable),
        ("table", &request.table),
        ("column", &request.column),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Configuration(format!("sweep {what} must not be empty")));
        }
    }
    if request.years.is_empty() {
        return Err(AppError::Configuration(
            "sweep needs at least one year".to_string(),
        ));
    }
    Ok(())
}

fn run_step(plan: &SweepPlan<'_>, unit: &StepUnit) -> AppResult<()> {
    let request = plan.request;
    let name = OutputLayout::loop_namespace_name(&request.variable, unit.year, unit.value);
    let namespace = plan.manager.allocate_nested(&request.scenario, &name)?;

    let layout = plan
        .base
        .copy_to(&namespace.engine_outputs.join(STEP_INPUTS))?;
    let mut table = layout.read_table(&request.table)?;
    table.set(&request.variable, &request.column, format_step_value(unit.value));
    layout.write_table(&table)?;

    let location = plan.location.with_year(unit.year);
    let mut metadata = ProjectMetadata::load(&layout)?;
    metadata.set_location(location.latitude, location.longitude, &location.country, unit.year);
    metadata.save()?;

    let weather = plan
        .weather
        .get(&unit.year)
        .cloned()
        .ok_or_else(|| AppError::Configuration(format!("no weather resolved for {}", unit.year)))?;
    let inputs = stage_inputs(plan.settings, location, weather, DemandOverrides::default());
    let mut ctx = StageContext::new(layout.clone(), inputs);
    ctx.pin(&request.table, &request.variable, &request.column);
    plan.services.pipeline.run(&mut ctx)?;

    let results = plan
        .services
        .engine
        .run(layout.root(), &namespace.engine_outputs, true)?;

    let collected = plan
        .outputs
        .collected_scalars(&request.scenario, &request.variable, unit.year, unit.value);
    if let Some(parent) = collected.parent() {
        std::fs::create_dir_all(parent).map_err(AppError::io(parent))?;
    }
    std::fs::copy(&results.scalars, &collected).map_err(AppError::io(&collected))?;
    debug!(step = %name, "sweep step complete");
    Ok(())
}
