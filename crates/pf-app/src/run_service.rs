//! Single-scenario flow: resolve, prepare, allocate, simulate.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use pf_core::Location;
use pf_project::{InputLayout, LocationRequest, ProjectMetadata, Settings, resolve_location};
use pf_results::ResultFiles;
use pf_stages::{DemandOverrides, PipelineReport, StageContext, StageInputs};
use pf_weather::{WeatherKey, WeatherSeries};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::progress::{ProgressCallback, RunStage, emit};
use crate::scenario::{RunState, ScenarioManager, ScenarioNamespace, ScenarioRun};
use crate::services::Services;

#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub scenario: String,
    pub location: LocationRequest,
    /// Read verbatim instead of the weather cache.
    pub weather_file: Option<PathBuf>,
    pub demand_overrides: DemandOverrides,
}

#[derive(Debug, Clone)]
pub struct PrepareResponse {
    pub location: Location,
    pub report: PipelineReport,
}

#[derive(Debug, Clone, Default)]
pub struct RunTiming {
    pub prepare_s: f64,
    pub engine_s: f64,
    pub total_s: f64,
}

#[derive(Debug, Clone)]
pub struct RunResponse {
    pub location: Location,
    pub namespace: ScenarioNamespace,
    pub report: PipelineReport,
    pub results: ResultFiles,
    pub timing: RunTiming,
    /// Final run state, always `Complete` on success.
    pub run: ScenarioRun,
}

/// Read-only stage inputs for one location/year.
pub(crate) fn stage_inputs(
    settings: &Settings,
    location: Location,
    weather: Arc<WeatherSeries>,
    demand_overrides: DemandOverrides,
) -> StageInputs {
    StageInputs {
        location,
        weather,
        storeys: settings.storeys,
        static_inputs: settings.paths.static_inputs.clone(),
        user_inputs: settings.paths.user_inputs.clone(),
        policies: settings.overwrite,
        demand_overrides,
        pv_setup: None,
    }
}

pub(crate) fn weather_key(location: &Location) -> WeatherKey {
    WeatherKey::new(location.latitude, location.longitude, location.year)
}

/// Resolve the location and weather, then run the stage pipeline in place on
/// the configured engine inputs.
pub fn prepare(
    settings: &Settings,
    services: &Services,
    request: &RunRequest,
    progress_cb: Option<ProgressCallback<'_>>,
) -> AppResult<PrepareResponse> {
    let started = Instant::now();
    settings.validate()?;
    let layout = settings.input_layout();
    prepare_layout(settings, services, &layout, request, progress_cb, started)
}

fn prepare_layout(
    settings: &Settings,
    services: &Services,
    layout: &InputLayout,
    request: &RunRequest,
    progress_cb: Option<ProgressCallback<'_>>,
    started: Instant,
) -> AppResult<PrepareResponse> {
    emit(progress_cb, RunStage::ResolvingLocation, started, None, None);
    let location = resolve_location(settings, layout, &request.location)?;

    emit(progress_cb, RunStage::ResolvingWeather, started, None, None);
    let weather = services
        .weather
        .resolve(weather_key(&location), request.weather_file.as_deref())?;

    emit(progress_cb, RunStage::PreparingInputs, started, None, None);
    let inputs = stage_inputs(
        settings,
        location.clone(),
        weather,
        request.demand_overrides.clone(),
    );
    let mut ctx = StageContext::new(layout.clone(), inputs);
    let report = services.pipeline.run(&mut ctx)?;
    info!(writes = report.total_writes(), "inputs prepared");

    Ok(PrepareResponse { location, report })
}

/// Full single-scenario run.
///
/// The scenario namespace is allocated before any input is touched, so a
/// conflicting scenario name leaves both inputs and outputs unchanged.
pub fn run_pipeline(
    settings: &Settings,
    services: &Services,
    request: &RunRequest,
    progress_cb: Option<ProgressCallback<'_>>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    settings.validate()?;
    let layout = settings.input_layout();
    let manager = ScenarioManager::new(settings.output_layout());

    emit(progress_cb, RunStage::AllocatingScenario, started, None, None);
    let namespace = manager.allocate(&request.scenario)?;
    let mut run = ScenarioRun::new(&request.scenario);

    match execute(settings, services, &layout, &namespace, request, progress_cb, started, &mut run) {
        Ok(response) => {
            emit(
                progress_cb,
                RunStage::Completed,
                started,
                Some(format!("scenario {} complete", request.scenario)),
                None,
            );
            Ok(response)
        }
        Err(e) => {
            let reached = run.state();
            warn!(scenario = %request.scenario, reached = reached.as_str(), error = %e, "scenario failed");
            run.fail(e.to_string())?;
            Err(AppError::ScenarioFailed {
                scenario: request.scenario.clone(),
                reached,
                source: Box::new(e),
            })
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn execute(
    settings: &Settings,
    services: &Services,
    layout: &InputLayout,
    namespace: &ScenarioNamespace,
    request: &RunRequest,
    progress_cb: Option<ProgressCallback<'_>>,
    started: Instant,
    run: &mut ScenarioRun,
) -> AppResult<RunResponse> {
    let prepared = prepare_layout(settings, services, layout, request, progress_cb, started)?;
    let mut metadata = ProjectMetadata::load(layout)?;
    metadata.set_scenario_name(&request.scenario);
    metadata.save()?;
    run.advance(RunState::Prepared)?;
    let prepare_s = started.elapsed().as_secs_f64();

    emit(progress_cb, RunStage::RunningEngine, started, None, None);
    let engine_started = Instant::now();
    let results = services
        .engine
        .run(layout.root(), &namespace.engine_outputs, true)?;
    let engine_s = engine_started.elapsed().as_secs_f64();
    run.advance(RunState::Simulated)?;

    emit(progress_cb, RunStage::CollectingResults, started, None, None);
    run.advance(RunState::Complete)?;
    info!(
        scenario = %request.scenario,
        prepare_s,
        engine_s,
        "scenario complete"
    );

    Ok(RunResponse {
        location: prepared.location,
        namespace: namespace.clone(),
        report: prepared.report,
        results,
        timing: RunTiming {
            prepare_s,
            engine_s,
            total_s: started.elapsed().as_secs_f64(),
        },
        run: run.clone(),
    })
}
