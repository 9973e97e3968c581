mod common;

use common::{FakeEngine, fixture};
use pf_app::{AppError, ErrorKind, RunRequest, RunState, prepare, run_pipeline};
use pf_project::tables::{ENERGY_PRODUCTION, ENERGY_PROVIDERS};
use pf_project::{LocationRequest, ProjectMetadata};

fn berlin(scenario: &str) -> RunRequest {
    RunRequest {
        scenario: scenario.to_string(),
        location: LocationRequest {
            latitude: Some(52.52437),
            longitude: Some(13.41053),
            country: None,
            year: Some(2017),
        },
        ..RunRequest::default()
    }
}

#[test]
fn weather_is_fetched_once_across_runs() {
    let fx = fixture("weather_once", FakeEngine::default());

    run_pipeline(&fx.settings, &fx.services, &berlin("Scenario_A"), None).unwrap();
    assert_eq!(fx.provider.calls(), 1);
    assert!(
        fx.settings
            .paths
            .static_inputs
            .join("weatherdata_52.52437_13.41053_2017.csv")
            .is_file()
    );

    run_pipeline(&fx.settings, &fx.services, &berlin("Scenario_B"), None).unwrap();
    assert_eq!(fx.provider.calls(), 1);
    assert_eq!(fx.engine.calls(), 2);
}

#[test]
fn run_writes_inputs_and_engine_results() {
    let fx = fixture("full_run", FakeEngine::default());
    let response = run_pipeline(&fx.settings, &fx.services, &berlin("Scenario_A"), None).unwrap();

    assert_eq!(response.location.country, "Germany");
    assert!(response.results.scalars.starts_with(&response.namespace.engine_outputs));
    assert!(response.report.stage("pv").unwrap().ran);
    assert_eq!(response.run.state(), RunState::Complete);

    let layout = fx.settings.input_layout();
    let production = layout.read_table(ENERGY_PRODUCTION).unwrap();
    assert_eq!(production.get("file_name", "PV si"), Some("pv_si_2017.csv"));
    let providers = layout.read_table(ENERGY_PROVIDERS).unwrap();
    assert_eq!(providers.get("feedin_tariff", "Electricity grid"), Some("0.08"));

    let metadata = ProjectMetadata::load(&layout).unwrap();
    assert_eq!(metadata.scenario_name(), Some("Scenario_A"));
    assert_eq!(metadata.year().unwrap(), Some(2017));
}

#[test]
fn reused_scenario_name_conflicts_before_touching_inputs() {
    let fx = fixture("conflict", FakeEngine::default());
    run_pipeline(&fx.settings, &fx.services, &berlin("Scenario_A"), None).unwrap();
    let scalars = fx.root.join("outputs/Scenario_A/mvs_outputs/scalars.csv");
    let before = std::fs::read_to_string(&scalars).unwrap();

    let mut again = berlin("Scenario_A");
    again.location.year = Some(2018);
    let err = run_pipeline(&fx.settings, &fx.services, &again, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(std::fs::read_to_string(&scalars).unwrap(), before);

    let metadata = ProjectMetadata::load(&fx.settings.input_layout()).unwrap();
    assert_eq!(metadata.year().unwrap(), Some(2017));
    assert_eq!(fx.provider.calls(), 1);
}

#[test]
fn prepare_only_never_calls_the_engine() {
    let fx = fixture("prepare", FakeEngine::default());
    let response = prepare(&fx.settings, &fx.services, &berlin("unused"), None).unwrap();
    assert!(response.report.total_writes() > 0);
    assert_eq!(fx.engine.calls(), 0);
    assert!(!fx.root.join("outputs").exists());
}

#[test]
fn missing_location_is_a_configuration_error() {
    let fx = fixture("no_location", FakeEngine::default());
    let err = prepare(&fx.settings, &fx.services, &RunRequest::default(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn engine_failure_is_a_provider_error() {
    let fx = fixture("engine_failure", FakeEngine::failing_on(&["25"]));
    let err = run_pipeline(&fx.settings, &fx.services, &berlin("Scenario_A"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Provider);
    match err {
        AppError::ScenarioFailed {
            scenario,
            reached,
            source,
        } => {
            assert_eq!(scenario, "Scenario_A");
            assert_eq!(reached, RunState::Prepared);
            assert!(matches!(*source, AppError::Engine(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}
