#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use pf_app::{AppError, AppResult, Services, SimulationEngine};
use pf_core::LabeledTable;
use pf_project::{PathSettings, Settings};
use pf_results::ResultFiles;
use pf_weather::{WeatherKey, WeatherProvider, WeatherRecord, WeatherResult, WeatherSeries};

pub fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pf_app_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[derive(Default)]
pub struct CountingProvider {
    calls: AtomicUsize,
}

impl CountingProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WeatherProvider for CountingProvider {
    fn fetch(&self, key: &WeatherKey) -> WeatherResult<WeatherSeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let start = NaiveDate::from_ymd_opt(key.year, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let records = (0..24)
            .map(|h| WeatherRecord {
                time: start + chrono::Duration::hours(h),
                ghi: if (8..16).contains(&h) { 450.0 } else { 0.0 },
                dni: 200.0,
                dhi: 90.0,
                temp_air: 4.0 + h as f64 * 0.3,
                wind_speed: 3.0,
                precipitable_water: 1.1,
            })
            .collect();
        Ok(WeatherSeries::new(*key, records))
    }
}

/// Writes result tables derived from the `lifetime` of `PV si`.
#[derive(Default)]
pub struct FakeEngine {
    calls: AtomicUsize,
    /// Lifetimes for which the engine fails.
    pub fail_on: Vec<String>,
}

impl FakeEngine {
    pub fn failing_on(lifetimes: &[&str]) -> Self {
        Self {
            fail_on: lifetimes.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SimulationEngine for FakeEngine {
    fn run(&self, input: &Path, output: &Path, _overwrite: bool) -> AppResult<ResultFiles> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let production =
            LabeledTable::read_csv(&input.join("csv_elements/energyProduction.csv")).unwrap();
        let lifetime = production.get("lifetime", "PV si").unwrap_or("0").to_string();
        if self.fail_on.contains(&lifetime) {
            return Err(AppError::Engine(format!("solver infeasible at lifetime {lifetime}")));
        }
        let lifetime: f64 = lifetime.parse().unwrap();

        write(
            &output.join("cost_matrix.csv"),
            &format!(
                ",label,costs_total,levelized_cost_of_energy_of_asset\n0,PV si,{},0.1\n",
                lifetime * 10.0
            ),
        );
        write(
            &output.join("scalar_matrix.csv"),
            ",label,optimizedAddCap\n0,PV si,42\n",
        );
        let mut scalars = String::from(",0\n");
        for label in [
            "Total renewable energy use",
            "Renewable factor",
            "Onsite energy fraction",
            "Onsite energy matching",
            "Degree of autonomy",
            "Total emissions",
            "Total non-renewable energy use",
            "Degree of NZE",
        ] {
            scalars.push_str(&format!("{label},{}\n", lifetime / 100.0));
        }
        write(&output.join("scalars.csv"), &scalars);
        pf_app::locate_results(output)
    }
}

pub struct Fixture {
    pub root: PathBuf,
    pub settings: Settings,
    pub services: Services,
    pub provider: Arc<CountingProvider>,
    pub engine: Arc<FakeEngine>,
}

/// A project with one PV asset, electricity demand and a grid provider.
pub fn fixture(name: &str, engine: FakeEngine) -> Fixture {
    let root = scratch(name);
    let mut settings = Settings {
        paths: PathSettings {
            static_inputs: root.join("static"),
            user_inputs: root.join("user"),
            mvs_inputs: root.join("mvs_inputs"),
            outputs: root.join("outputs"),
        },
        ..Settings::default()
    };
    settings.default_location.country = Some("Germany".to_string());

    let elements = settings.paths.mvs_inputs.join("csv_elements");
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
        "label,unit,Electricity grid\nenergy_price,currency/kWh,\nfeedin_tariff,currency/kWh,\nemission_factor,kgCO2eq/kWh,\nrenewable_share,factor,\n",
    );
    write(
        &settings.paths.static_inputs.join("local_grid_parameters.csv"),
        "country,energy_price,feedin_tariff,emission_factor,renewable_share\nGermany,0.3,0.08,0.4,0.45\n",
    );
    write(
        &settings.paths.user_inputs.join("pv_setup.csv"),
        "surface_type,technology,surface_azimuth,surface_tilt\nflat_roof,si,180,30\n",
    );

    let provider = Arc::new(CountingProvider::default());
    let engine = Arc::new(engine);
    let services = Services::from_settings(&settings)
        .unwrap()
        .with_weather_provider(provider.clone())
        .with_engine(engine.clone());

    Fixture {
        root,
        settings,
        services,
        provider,
        engine,
    }
}
