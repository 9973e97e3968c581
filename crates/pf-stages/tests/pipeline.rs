use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use pf_core::{Location, OverwritePolicies, OverwritePolicy};
use pf_project::InputLayout;
use pf_project::tables::{ENERGY_CONSUMPTION, ENERGY_CONVERSION, ENERGY_PRODUCTION, ENERGY_PROVIDERS};
use pf_stages::reference::ReferencePv;
use pf_stages::stages::PvStage;
use pf_stages::{
    ColumnOwnership, ColumnSelector, Concern, DemandOverrides, Pipeline, PipelineError,
    PipelineResult, PvSetup, Stage, StageContext, StageInputs, StageModels,
};
use pf_weather::{WeatherKey, WeatherRecord, WeatherSeries};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pf_stages_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn weather() -> Arc<WeatherSeries> {
    let key = WeatherKey::new(40.416775, -3.70379, 2014);
    let start = NaiveDate::from_ymd_opt(2014, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let records = (0..48)
        .map(|h| WeatherRecord {
            time: start + chrono::Duration::hours(h),
            ghi: if (8..16).contains(&(h % 24)) { 500.0 } else { 0.0 },
            dni: 300.0,
            dhi: 120.0,
            temp_air: 2.0 + (h % 24) as f64 * 0.5,
            wind_speed: 2.0,
            precipitable_water: 1.0,
        })
        .collect();
    Arc::new(WeatherSeries::new(key, records))
}

/// A scenario with PV, electricity demand and a grid provider.
fn scenario(name: &str) -> (PathBuf, InputLayout) {
    let root = scratch(name);
    let layout = InputLayout::new(root.join("mvs_inputs"));
    let elements = layout.csv_elements();
    write(
        &elements.join("energyProduction.csv"),
        "label,unit,PV si\nfile_name,str,\nmaximumCap,kWp,\nlifetime,year,25\n",
    );
    write(
        &elements.join("energyConsumption.csv"),
        "label,unit,Electricity demand\nfile_name,str,\n",
    );
    write(
        &elements.join("energyProviders.csv"),
        "label,unit,Electricity grid\nenergy_price,currency/kWh,0.3\nfeedin_tariff,currency/kWh,\nemission_factor,kgCO2eq/kWh,\nrenewable_share,factor,\n",
    );
    write(
        &root.join("static/local_grid_parameters.csv"),
        "country,energy_price,feedin_tariff,emission_factor,renewable_share\nSpain,0.24,0.05,0.28,0.4\n",
    );
    (root, layout)
}

fn inputs(root: &Path, policies: OverwritePolicies) -> StageInputs {
    StageInputs {
        location: Location::new(40.416775, -3.70379, "Spain", 2014),
        weather: weather(),
        storeys: 5,
        static_inputs: root.join("static"),
        user_inputs: root.join("user"),
        policies,
        demand_overrides: DemandOverrides::default(),
        pv_setup: Some(vec![PvSetup {
            surface_type: "flat_roof".to_string(),
            technology: "si".to_string(),
            surface_azimuth: 180.0,
            surface_tilt: 30.0,
        }]),
    }
}

fn run(layout: &InputLayout, inputs: StageInputs) -> PipelineResult<pf_stages::PipelineReport> {
    let pipeline = Pipeline::standard(&StageModels::reference())?;
    let mut ctx = StageContext::new(layout.clone(), inputs);
    pipeline.run(&mut ctx)
}

#[test]
fn standard_pipeline_fills_missing_values() {
    let (root, layout) = scenario("fill");
    let report = run(&layout, inputs(&root, OverwritePolicies::default())).unwrap();

    let production = layout.read_table(ENERGY_PRODUCTION).unwrap();
    assert_eq!(production.get("file_name", "PV si"), Some("pv_si_2014.csv"));
    assert!(production.get_f64("maximumCap", "PV si").unwrap() > 0.0);
    assert_eq!(production.get("lifetime", "PV si"), Some("25"));
    assert!(layout.time_series().join("pv_si_2014.csv").is_file());

    let providers = layout.read_table(ENERGY_PROVIDERS).unwrap();
    assert_eq!(providers.get("energy_price", "Electricity grid"), Some("0.24"));
    assert_eq!(providers.get("renewable_share", "Electricity grid"), Some("0.4"));

    let consumption = layout.read_table(ENERGY_CONSUMPTION).unwrap();
    assert_eq!(
        consumption.get("file_name", "Electricity demand"),
        Some("electricity_load_2014_spain_5.csv")
    );

    assert!(!report.stage("sector_coupling").unwrap().ran);
    assert!(!report.stage("thermal_storage").unwrap().ran);
    assert_eq!(
        Pipeline::standard(&StageModels::reference()).unwrap().stage_names(),
        vec!["grid", "pv", "sector_coupling", "demand", "thermal_storage"]
    );
}

#[test]
fn preserve_keeps_existing_values_and_reruns_are_noops() {
    let (root, layout) = scenario("preserve");
    let policies = OverwritePolicies::uniform(OverwritePolicy::Preserve);
    run(&layout, inputs(&root, policies)).unwrap();

    let providers = layout.read_table(ENERGY_PROVIDERS).unwrap();
    assert_eq!(providers.get("energy_price", "Electricity grid"), Some("0.3"));
    assert_eq!(providers.get("feedin_tariff", "Electricity grid"), Some("0.05"));

    let before: Vec<_> = [ENERGY_PRODUCTION, ENERGY_CONSUMPTION, ENERGY_PROVIDERS]
        .iter()
        .map(|t| layout.read_table(t).unwrap())
        .collect();
    let report = run(&layout, inputs(&root, policies)).unwrap();
    assert_eq!(report.total_writes(), 0);

    for table in before {
        let after = layout.read_table(table.name()).unwrap();
        assert!(table.diff(&after).is_empty(), "{} changed", table.name());
    }
}

#[test]
fn sector_coupling_runs_only_with_a_declared_heat_pump() {
    let (root, layout) = scenario("heat_pump");
    write(
        &layout.csv_elements().join("energyConversion.csv"),
        "label,unit,Heat pump,Electrolyzer\nefficiency,factor,,0.7\n",
    );
    let report = run(&layout, inputs(&root, OverwritePolicies::default())).unwrap();
    assert!(report.stage("sector_coupling").unwrap().ran);

    let conversion = layout.read_table(ENERGY_CONVERSION).unwrap();
    assert_eq!(
        conversion.get("efficiency", "Heat pump"),
        Some("cop_heat_pump_2014.csv")
    );
    assert_eq!(conversion.get("efficiency", "Electrolyzer"), Some("0.7"));
    assert!(layout.time_series().join("cop_heat_pump_2014.csv").is_file());
}

#[test]
fn thermal_storage_writes_loss_series() {
    let (root, layout) = scenario("storage");
    write(
        &layout.csv_elements().join("storage_01.csv"),
        "label,unit,storage capacity,input power\nfixed_thermal_losses_relative,factor,,\nfixed_thermal_losses_absolute,kWh,,\n",
    );
    let report = run(&layout, inputs(&root, OverwritePolicies::default())).unwrap();
    assert!(report.stage("thermal_storage").unwrap().ran);

    let storage = layout.read_table("storage_01").unwrap();
    assert_eq!(
        storage.get("fixed_thermal_losses_relative", "storage capacity"),
        Some("fixed_thermal_losses_relative_2014.csv")
    );
    assert_eq!(storage.get("fixed_thermal_losses_relative", "input power"), None);
}

#[test]
fn pinned_cells_survive_overwrite() {
    let (root, layout) = scenario("pinned");
    let mut production = layout.read_table(ENERGY_PRODUCTION).unwrap();
    production.set("maximumCap", "PV si", "12.5");
    layout.write_table(&production).unwrap();

    let pipeline = Pipeline::standard(&StageModels::reference()).unwrap();
    let mut ctx = StageContext::new(layout.clone(), inputs(&root, OverwritePolicies::default()));
    ctx.pin(ENERGY_PRODUCTION, "maximumCap", "PV si");
    let report = pipeline.run(&mut ctx).unwrap();

    assert_eq!(report.stage("pv").unwrap().counts.pinned, 1);
    let production = layout.read_table(ENERGY_PRODUCTION).unwrap();
    assert_eq!(production.get("maximumCap", "PV si"), Some("12.5"));
}

#[test]
fn demand_override_is_copied_verbatim() {
    let (root, layout) = scenario("override");
    let override_path = root.join("measured_load.csv");
    write(&override_path, "kWh\n1.5\n2.5\n");

    let mut inputs = inputs(&root, OverwritePolicies::default());
    inputs.demand_overrides.electricity = Some(override_path);
    run(&layout, inputs).unwrap();

    let consumption = layout.read_table(ENERGY_CONSUMPTION).unwrap();
    assert_eq!(
        consumption.get("file_name", "Electricity demand"),
        Some("measured_load.csv")
    );
    let copied = std::fs::read_to_string(layout.time_series().join("measured_load.csv")).unwrap();
    assert_eq!(copied, "kWh\n1.5\n2.5\n");
}

#[test]
fn failed_run_leaves_tables_on_disk_untouched() {
    let (root, layout) = scenario("failure");
    let mut inputs = inputs(&root, OverwritePolicies::default());
    // No pv_setup.csv under the user inputs.
    inputs.pv_setup = None;

    let err = run(&layout, inputs).unwrap_err();
    assert!(matches!(err, PipelineError::MissingInput { stage: "pv", .. }));

    let providers = layout.read_table(ENERGY_PROVIDERS).unwrap();
    assert_eq!(providers.get("energy_price", "Electricity grid"), Some("0.3"));
}

#[test]
fn overlapping_ownership_is_rejected_at_build_time() {
    let pv = || PvStage::new(Arc::new(ReferencePv::default()));
    let err = Pipeline::builder()
        .with_stage(pv())
        .with_stage(pv())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, PipelineError::OwnershipConflict { .. }));
}

struct RogueStage;

impl Stage for RogueStage {
    fn name(&self) -> &'static str {
        "rogue"
    }

    fn concern(&self) -> Option<Concern> {
        Some(Concern::Pv)
    }

    fn writes(&self) -> Vec<ColumnOwnership> {
        vec![ColumnOwnership::new(
            ENERGY_PRODUCTION,
            ColumnSelector::exact("Wind turbine"),
        )]
    }

    fn run(&self, ctx: &mut StageContext) -> PipelineResult<()> {
        ctx.set(ENERGY_PRODUCTION, "lifetime", "PV si", "40")?;
        Ok(())
    }
}

#[test]
fn writes_outside_the_declaration_fail() {
    let (root, layout) = scenario("rogue");
    let pipeline = Pipeline::builder().with_stage(RogueStage).build().unwrap();
    let mut ctx = StageContext::new(layout.clone(), inputs(&root, OverwritePolicies::default()));

    let err = pipeline.run(&mut ctx).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::UndeclaredWrite { stage: "rogue", .. }
    ));
    let production = layout.read_table(ENERGY_PRODUCTION).unwrap();
    assert_eq!(production.get("lifetime", "PV si"), Some("25"));
}

struct FailingStage;

impl Stage for FailingStage {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn concern(&self) -> Option<Concern> {
        None
    }

    fn writes(&self) -> Vec<ColumnOwnership> {
        Vec::new()
    }

    fn run(&self, _ctx: &mut StageContext) -> PipelineResult<()> {
        Err(PipelineError::Model {
            stage: "failing",
            message: "no convergence".to_string(),
        })
    }
}

#[test]
fn series_are_only_written_when_the_whole_run_succeeds() {
    let (root, layout) = scenario("staged_series");
    let pipeline = Pipeline::builder()
        .with_stage(PvStage::new(Arc::new(ReferencePv::default())))
        .with_stage(FailingStage)
        .build()
        .unwrap();
    let mut ctx = StageContext::new(layout.clone(), inputs(&root, OverwritePolicies::default()));

    let err = pipeline.run(&mut ctx).unwrap_err();
    assert!(matches!(err, PipelineError::Model { stage: "failing", .. }));
    assert_eq!(ctx.staged_series().collect::<Vec<_>>(), vec!["pv_si_2014.csv"]);
    assert!(!layout.time_series().join("pv_si_2014.csv").exists());
    let production = layout.read_table(ENERGY_PRODUCTION).unwrap();
    assert_eq!(production.get("file_name", "PV si"), None);
}
