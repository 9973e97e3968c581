//! KPI catalogue and the aggregated (year, step) table.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;

use pf_core::format_step_value;

use crate::files::{AssetMatrix, ScalarTable};
use crate::{ResultsError, ResultsResult};

/// Metrics extracted from every sweep step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KpiMetric {
    CostsTotalPv,
    InstalledCapacityPv,
    LcoePv,
    TotalRenewableEnergy,
    RenewableFactor,
    OnsiteEnergyFraction,
    OnsiteEnergyMatching,
    DegreeOfAutonomy,
    TotalEmissions,
    TotalNonRenewableEnergy,
    DegreeOfNze,
}

impl KpiMetric {
    pub const ALL: [KpiMetric; 11] = [
        KpiMetric::CostsTotalPv,
        KpiMetric::InstalledCapacityPv,
        KpiMetric::LcoePv,
        KpiMetric::TotalRenewableEnergy,
        KpiMetric::RenewableFactor,
        KpiMetric::OnsiteEnergyFraction,
        KpiMetric::OnsiteEnergyMatching,
        KpiMetric::DegreeOfAutonomy,
        KpiMetric::TotalEmissions,
        KpiMetric::TotalNonRenewableEnergy,
        KpiMetric::DegreeOfNze,
    ];

    /// Column header in exported tables.
    pub fn name(self) -> &'static str {
        match self {
            KpiMetric::CostsTotalPv => "Costs total PV",
            KpiMetric::InstalledCapacityPv => "Installed capacity PV",
            KpiMetric::LcoePv => "LCOE PV",
            KpiMetric::TotalRenewableEnergy => "Total renewable energy use",
            KpiMetric::RenewableFactor => "Renewable factor",
            KpiMetric::OnsiteEnergyFraction => "Onsite energy fraction",
            KpiMetric::OnsiteEnergyMatching => "Onsite energy matching",
            KpiMetric::DegreeOfAutonomy => "Degree of autonomy",
            KpiMetric::TotalEmissions => "Total emissions",
            KpiMetric::TotalNonRenewableEnergy => "Total non-renewable energy use",
            KpiMetric::DegreeOfNze => "Degree of NZE",
        }
    }

    /// Compute the metric from one step's result tables.
    pub fn extract(
        self,
        scalars: &ScalarTable,
        costs: &AssetMatrix,
        capacities: &AssetMatrix,
        pv_assets: &[String],
    ) -> ResultsResult<f64> {
        let sum = |matrix: &AssetMatrix, column: &str| -> ResultsResult<f64> {
            pv_assets
                .iter()
                .map(|pv| matrix.value(pv, column))
                .sum()
        };
        match self {
            KpiMetric::CostsTotalPv => sum(costs, "costs_total"),
            KpiMetric::InstalledCapacityPv => sum(capacities, "optimizedAddCap"),
            KpiMetric::LcoePv => {
                let total = sum(costs, "levelized_cost_of_energy_of_asset")?;
                Ok(total / pv_assets.len() as f64)
            }
            // Every remaining metric is a scalars.csv row of the same name.
            other => scalars.value(other.name()),
        }
    }
}

impl fmt::Display for KpiMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KpiRow {
    pub year: i32,
    pub step: f64,
    pub values: BTreeMap<KpiMetric, f64>,
}

impl KpiRow {
    pub fn get(&self, metric: KpiMetric) -> Option<f64> {
        self.values.get(&metric).copied()
    }
}

/// KPI rows keyed by (year, step index).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiTable {
    rows: BTreeMap<(i32, usize), KpiRow>,
}

impl KpiTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, replacing any row with the same key.
    pub fn insert(&mut self, index: usize, row: KpiRow) {
        self.rows.insert((row.year, index), row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &KpiRow> {
        self.rows.values()
    }

    pub fn get(&self, year: i32, index: usize) -> Option<&KpiRow> {
        self.rows.get(&(year, index))
    }

    pub fn write_csv(&self, path: &Path) -> ResultsResult<()> {
        let file = create(path)?;
        self.write_rows(file, path, None, true)
    }

    pub(crate) fn write_rows(
        &self,
        writer: impl Write,
        path: &Path,
        scenario: Option<&str>,
        header: bool,
    ) -> ResultsResult<()> {
        let csv_err = |source| ResultsError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut wtr = csv::Writer::from_writer(writer);
        if header {
            wtr.write_record(header_row(scenario.is_some()))
                .map_err(csv_err)?;
        }
        for row in self.rows() {
            let mut record: Vec<String> = scenario.map(str::to_string).into_iter().collect();
            record.push(row.year.to_string());
            record.push(format_step_value(row.step));
            for metric in KpiMetric::ALL {
                record.push(row.get(metric).map(|v| v.to_string()).unwrap_or_default());
            }
            wtr.write_record(&record).map_err(csv_err)?;
        }
        wtr.flush().map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub(crate) fn header_row(with_scenario: bool) -> Vec<&'static str> {
    let mut header = Vec::new();
    if with_scenario {
        header.push("scenario");
    }
    header.push("year");
    header.push("step");
    header.extend(KpiMetric::ALL.iter().map(|m| m.name()));
    header
}

pub(crate) fn create(path: &Path) -> ResultsResult<std::fs::File> {
    let io_err = |source| ResultsError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::File::create(path).map_err(io_err)
}
