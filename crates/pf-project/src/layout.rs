//! On-disk layout of engine inputs and scenario outputs.

use std::path::{Path, PathBuf};

use pf_core::{LabeledTable, format_step_value};

use crate::ProjectResult;

/// File stems of the tables under `csv_elements/`.
pub mod tables {
    pub const PROJECT_DATA: &str = "project_data";
    pub const SIMULATION_SETTINGS: &str = "simulation_settings";
    pub const ENERGY_PRODUCTION: &str = "energyProduction";
    pub const ENERGY_CONSUMPTION: &str = "energyConsumption";
    pub const ENERGY_CONVERSION: &str = "energyConversion";
    pub const ENERGY_PROVIDERS: &str = "energyProviders";
    pub const STORAGE_THERMAL: &str = "storage_01";
}

pub const CSV_ELEMENTS: &str = "csv_elements";
pub const TIME_SERIES: &str = "time_series";
pub const MVS_OUTPUTS: &str = "mvs_outputs";
pub const STEP_INPUTS: &str = "inputs";

/// An engine input namespace: `<root>/csv_elements/*.csv` and `<root>/time_series/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLayout {
    root: PathBuf,
}

impl InputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn csv_elements(&self) -> PathBuf {
        self.root.join(CSV_ELEMENTS)
    }

    pub fn time_series(&self) -> PathBuf {
        self.root.join(TIME_SERIES)
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.csv_elements().join(format!("{table}.csv"))
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.table_path(table).is_file()
    }

    pub fn read_table(&self, table: &str) -> ProjectResult<LabeledTable> {
        Ok(LabeledTable::read_csv(&self.table_path(table))?)
    }

    pub fn write_table(&self, table: &LabeledTable) -> ProjectResult<()> {
        Ok(table.write_csv(&self.table_path(table.name()))?)
    }

    /// Copy `csv_elements/` and `time_series/` into `dest`, returning the new layout.
    pub fn copy_to(&self, dest: &Path) -> ProjectResult<InputLayout> {
        let target = InputLayout::new(dest);
        copy_dir(&self.csv_elements(), &target.csv_elements())?;
        if self.time_series().is_dir() {
            copy_dir(&self.time_series(), &target.time_series())?;
        }
        Ok(target)
    }
}

fn copy_dir(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            copy_dir(&path, &dest.join(entry.file_name()))?;
        } else {
            std::fs::copy(&path, dest.join(entry.file_name()))?;
        }
    }
    Ok(())
}

/// Naming of scenario and sweep directories below the outputs root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scenario_dir(&self, scenario: &str) -> PathBuf {
        self.root.join(scenario)
    }

    pub fn mvs_outputs(&self, scenario: &str) -> PathBuf {
        self.scenario_dir(scenario).join(MVS_OUTPUTS)
    }

    /// `mvs_outputs_loop_<variable>_<year>_<step>`
    pub fn loop_namespace_name(variable: &str, year: i32, value: f64) -> String {
        format!(
            "{MVS_OUTPUTS}_loop_{variable}_{year}_{}",
            format_step_value(value)
        )
    }

    pub fn loop_namespace(&self, scenario: &str, variable: &str, year: i32, value: f64) -> PathBuf {
        self.scenario_dir(scenario)
            .join(Self::loop_namespace_name(variable, year, value))
    }

    /// Engine inputs of one sweep step.
    pub fn loop_inputs(&self, scenario: &str, variable: &str, year: i32, value: f64) -> InputLayout {
        InputLayout::new(self.loop_namespace(scenario, variable, year, value).join(STEP_INPUTS))
    }

    /// `loop_outputs_<variable>`: collected scalars and the sweep manifest.
    pub fn loop_outputs(&self, scenario: &str, variable: &str) -> PathBuf {
        self.scenario_dir(scenario)
            .join(format!("loop_outputs_{variable}"))
    }

    pub fn collected_scalars(&self, scenario: &str, variable: &str, year: i32, value: f64) -> PathBuf {
        self.loop_outputs(scenario, variable)
            .join("scalars")
            .join(format!("scalars_{year}_{}.csv", format_step_value(value)))
    }

    pub fn sweep_manifest(&self, scenario: &str, variable: &str) -> PathBuf {
        self.loop_outputs(scenario, variable)
            .join("sweep_manifest.json")
    }
}
