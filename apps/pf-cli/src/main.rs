use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use pf_app::{
    AppError, AppResult, ProgressEvent, RunRequest, RunStage, Services, SweepRequest, prepare,
    run_pipeline, run_sweep,
};
use pf_core::{OverwritePolicies, OverwritePolicy, format_coordinate};
use pf_project::tables::ENERGY_PRODUCTION;
use pf_project::{LocationRequest, Settings, SettingsOverrides};
use pf_results::{aggregate_scenarios, aggregate_sweep, write_scenarios_csv};
use pf_stages::StageReport;
use pf_weather::summarize_years;
use tracing::Level;

const DEFAULT_CONFIG: &str = "pvflow.yaml";

#[derive(Parser)]
#[command(name = "pvflow")]
#[command(about = "pvflow - PV scenario preparation, simulation and parameter sweeps", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./pvflow.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    paths: PathArgs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PathArgs {
    /// Weather cache and country tables
    #[arg(long, global = true)]
    static_inputs: Option<PathBuf>,
    /// Directory holding pv_setup.csv
    #[arg(long, global = true)]
    user_inputs: Option<PathBuf>,
    /// Engine input directory containing csv_elements/
    #[arg(long, global = true)]
    mvs_inputs: Option<PathBuf>,
    #[arg(long, global = true)]
    outputs: Option<PathBuf>,
    #[arg(long, global = true)]
    storeys: Option<u32>,
    /// Sweep worker threads
    #[arg(long, global = true)]
    max_workers: Option<usize>,
    /// Keep existing values for these concerns instead of overwriting them
    #[arg(long, value_enum, value_delimiter = ',', global = true)]
    preserve: Vec<ConcernArg>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConcernArg {
    Grid,
    Pv,
    Heat,
    All,
}

#[derive(Args)]
struct LocationArgs {
    /// Latitude and longitude
    #[arg(long, value_delimiter = ',', num_args = 2, value_names = ["LAT", "LON"], allow_negative_numbers = true)]
    location: Option<Vec<f64>>,
    #[arg(long)]
    country: Option<String>,
}

#[derive(Args)]
struct PrepareArgs {
    #[command(flatten)]
    location: LocationArgs,
    /// Simulation year
    #[arg(long)]
    year: Option<i32>,
    /// Weather CSV used instead of the cache
    #[arg(long)]
    weather_file: Option<PathBuf>,
    /// Electricity demand series used instead of the demand model
    #[arg(long)]
    electricity_demand: Option<PathBuf>,
    /// Heat demand series used instead of the demand model
    #[arg(long)]
    heat_demand: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare inputs, allocate the scenario and run the engine
    RunPipeline {
        #[command(flatten)]
        prepare: PrepareArgs,
        /// Scenario name; must not exist under the outputs directory
        #[arg(long)]
        scenario: String,
    },
    /// Prepare inputs only
    Prepare {
        #[command(flatten)]
        prepare: PrepareArgs,
    },
    /// Run the pipeline and engine once per (year, value)
    RunSweep {
        #[arg(long)]
        scenario: String,
        /// Row label of the swept cell
        #[arg(long)]
        variable: String,
        /// Table containing the swept cell
        #[arg(long, default_value = ENERGY_PRODUCTION)]
        table: String,
        /// Column of the swept cell
        #[arg(long)]
        column: String,
        #[arg(long, allow_negative_numbers = true)]
        start: f64,
        /// Exclusive upper bound
        #[arg(long, allow_negative_numbers = true)]
        stop: f64,
        #[arg(long, allow_negative_numbers = true)]
        step: f64,
        #[arg(long, value_delimiter = ',', required = true)]
        years: Vec<i32>,
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Collect KPIs of finished sweeps into one table
    AggregateKpis {
        #[arg(long)]
        variable: String,
        #[arg(long, value_delimiter = ',', required = true)]
        scenarios: Vec<String>,
        /// Output CSV (defaults to <outputs>/kpis_<variable>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Summarize cached weather years for a location
    WeatherYears {
        #[command(flatten)]
        location: LocationArgs,
    },
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let settings = load_settings(cli.config.as_deref(), cli.paths)?;

    match cli.command {
        Commands::RunPipeline { prepare, scenario } => cmd_run_pipeline(&settings, prepare, scenario),
        Commands::Prepare { prepare } => cmd_prepare(&settings, prepare),
        Commands::RunSweep {
            scenario,
            variable,
            table,
            column,
            start,
            stop,
            step,
            years,
            location,
        } => cmd_run_sweep(
            &settings,
            SweepRequest {
                scenario,
                variable,
                table,
                column,
                start,
                stop,
                step,
                years,
                location: location_request(location, None)?,
            },
        ),
        Commands::AggregateKpis {
            variable,
            scenarios,
            output,
        } => cmd_aggregate(&settings, &variable, &scenarios, output.as_deref()),
        Commands::WeatherYears { location } => cmd_weather_years(&settings, location),
    }
}

fn load_settings(config: Option<&Path>, paths: PathArgs) -> AppResult<Settings> {
    let base = match config {
        Some(path) => Settings::load(path)?,
        None if Path::new(DEFAULT_CONFIG).is_file() => Settings::load(Path::new(DEFAULT_CONFIG))?,
        None => Settings::default(),
    };

    let overwrite = if paths.preserve.is_empty() {
        None
    } else {
        let mut policies = base.overwrite;
        for concern in &paths.preserve {
            match concern {
                ConcernArg::Grid => policies.grid = OverwritePolicy::Preserve,
                ConcernArg::Pv => policies.pv = OverwritePolicy::Preserve,
                ConcernArg::Heat => policies.heat = OverwritePolicy::Preserve,
                ConcernArg::All => policies = OverwritePolicies::uniform(OverwritePolicy::Preserve),
            }
        }
        Some(policies)
    };

    let settings = base.with_overrides(SettingsOverrides {
        static_inputs: paths.static_inputs,
        user_inputs: paths.user_inputs,
        mvs_inputs: paths.mvs_inputs,
        outputs: paths.outputs,
        storeys: paths.storeys,
        overwrite,
        max_workers: paths.max_workers,
    });
    settings.validate()?;
    Ok(settings)
}

fn location_request(args: LocationArgs, year: Option<i32>) -> AppResult<LocationRequest> {
    let (latitude, longitude) = match args.location.as_deref() {
        None => (None, None),
        Some([lat, lon]) => (Some(*lat), Some(*lon)),
        Some(other) => {
            return Err(AppError::Configuration(format!(
                "--location expects LAT,LON, got {} values",
                other.len()
            )));
        }
    };
    Ok(LocationRequest {
        latitude,
        longitude,
        country: args.country,
        year,
    })
}

fn run_request(args: PrepareArgs, scenario: String) -> AppResult<RunRequest> {
    let mut request = RunRequest {
        scenario,
        location: location_request(args.location, args.year)?,
        weather_file: args.weather_file,
        ..RunRequest::default()
    };
    request.demand_overrides.electricity = args.electricity_demand;
    request.demand_overrides.heat = args.heat_demand;
    Ok(request)
}

fn cmd_run_pipeline(settings: &Settings, args: PrepareArgs, scenario: String) -> AppResult<()> {
    println!("Running scenario: {scenario}");
    let services = Services::from_settings(settings)?;
    let request = run_request(args, scenario)?;

    let response = run_pipeline(settings, &services, &request, Some(&render_cli_progress));
    clear_progress_line();
    let response = response?;

    println!("✓ Scenario complete: {}", response.namespace.dir.display());
    println!("  Location: {}", response.location);
    for stage in &response.report.stages {
        print_stage(stage);
    }
    println!(
        "  Timing: prepare {:.2}s, engine {:.2}s, total {:.2}s",
        response.timing.prepare_s, response.timing.engine_s, response.timing.total_s
    );
    Ok(())
}

fn cmd_prepare(settings: &Settings, args: PrepareArgs) -> AppResult<()> {
    let services = Services::from_settings(settings)?;
    let request = run_request(args, String::new())?;

    let response = prepare(settings, &services, &request, Some(&render_cli_progress));
    clear_progress_line();
    let response = response?;

    println!("✓ Inputs prepared for {}", response.location);
    for stage in &response.report.stages {
        print_stage(stage);
    }
    Ok(())
}

fn cmd_run_sweep(settings: &Settings, request: SweepRequest) -> AppResult<()> {
    println!(
        "Sweeping {} of {}/{} from {} to {} step {}",
        request.variable, request.table, request.column, request.start, request.stop, request.step
    );
    let services = Services::from_settings(settings)?;

    let report = run_sweep(settings, &services, &request, Some(&render_cli_progress));
    clear_progress_line();
    let report = report?;

    println!(
        "✓ Sweep finished: {} succeeded, {} failed, {} already done",
        report.succeeded(),
        report.failed(),
        report.skipped.len()
    );
    for step in report.steps.iter().filter(|s| !s.succeeded()) {
        println!(
            "  ✗ {}: {}",
            step.label(),
            step.error.as_deref().unwrap_or_default()
        );
    }
    println!("  Manifest: {}", report.manifest.display());
    Ok(())
}

fn cmd_aggregate(
    settings: &Settings,
    variable: &str,
    scenarios: &[String],
    output: Option<&Path>,
) -> AppResult<()> {
    let outputs = settings.output_layout();
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| outputs.root().join(format!("kpis_{variable}.csv")));

    if let [scenario] = scenarios {
        let table = aggregate_sweep(&outputs, scenario, variable)?;
        table.write_csv(&path)?;
        println!("✓ {} rows written to {}", table.len(), path.display());
    } else {
        let tables = aggregate_scenarios(&outputs, scenarios, variable)?;
        write_scenarios_csv(&path, &tables)?;
        let rows: usize = tables.values().map(|t| t.len()).sum();
        println!(
            "✓ {rows} rows from {} scenarios written to {}",
            tables.len(),
            path.display()
        );
    }
    Ok(())
}

fn cmd_weather_years(settings: &Settings, args: LocationArgs) -> AppResult<()> {
    let request = location_request(args, None)?;
    let (Some(latitude), Some(longitude)) = (
        request.latitude.or(settings.default_location.latitude),
        request.longitude.or(settings.default_location.longitude),
    ) else {
        return Err(AppError::Configuration(
            "weather-years needs --location or a default location".to_string(),
        ));
    };

    let summaries = summarize_years(&settings.paths.static_inputs, latitude, longitude)?;
    if summaries.is_empty() {
        println!(
            "No cached weather for {}, {}",
            format_coordinate(latitude),
            format_coordinate(longitude)
        );
        return Ok(());
    }

    println!("Cached weather years:");
    println!("  year   GHI kWh/m²   DNI kWh/m²   DHI kWh/m²   mean T °C");
    for s in summaries {
        println!(
            "  {:<6} {:>11.1} {:>12.1} {:>12.1} {:>11.2}",
            s.year,
            s.ghi_sum / 1000.0,
            s.dni_sum / 1000.0,
            s.dhi_sum / 1000.0,
            s.temp_air_mean
        );
    }
    Ok(())
}

fn print_stage(stage: &StageReport) {
    if stage.ran {
        println!(
            "  {:<16} filled={} overwritten={} preserved={}",
            stage.name, stage.counts.filled, stage.counts.overwritten, stage.counts.preserved
        );
    } else {
        println!("  {:<16} skipped", stage.name);
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: ProgressEvent) {
    let mut line = match event.sweep {
        Some(p) if event.stage == RunStage::RunningEngine => {
            let width = 28usize;
            let filled = (p.completed * width).checked_div(p.total).unwrap_or(0).min(width);
            format!(
                "\r[{}{}] {}/{} steps  failed={}  elapsed={:.1}s",
                "#".repeat(filled),
                "-".repeat(width - filled),
                p.completed,
                p.total,
                p.failed,
                event.elapsed_wall_s
            )
        }
        _ => format!("\r{}  elapsed={:.2}s", event.stage.label(), event.elapsed_wall_s),
    };
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {msg}"));
    }
    print!("{line}");
    let _ = io::stdout().flush();
}
