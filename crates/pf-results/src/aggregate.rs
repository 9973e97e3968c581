//! Collect KPIs over every step of a sweep.

use std::collections::BTreeMap;
use std::path::Path;

use pf_core::LabeledTable;
use pf_project::layout::{CSV_ELEMENTS, STEP_INPUTS};
use pf_project::{OutputLayout, tables};
use tracing::{debug, info};

use crate::files::{AssetMatrix, ResultFiles, ScalarTable};
use crate::kpi::{KpiMetric, KpiRow, KpiTable, create, header_row};
use crate::manifest::{StepStatus, SweepManifest};
use crate::{ResultsError, ResultsResult};

/// PV asset columns of a step's `energyProduction` table.
fn pv_assets(step_dir: &Path) -> ResultsResult<Vec<String>> {
    let path = step_dir
        .join(STEP_INPUTS)
        .join(CSV_ELEMENTS)
        .join(format!("{}.csv", tables::ENERGY_PRODUCTION));
    if !path.is_file() {
        return Err(ResultsError::MissingFile { path });
    }
    let production = LabeledTable::read_csv(&path)?;
    let assets: Vec<String> = production
        .columns()
        .iter()
        .filter(|c| c.as_str() != "unit" && c.starts_with("PV"))
        .cloned()
        .collect();
    if assets.is_empty() {
        return Err(ResultsError::NoPvAssets { path });
    }
    Ok(assets)
}

/// Build the KPI table of one sweep.
///
/// Any failed step, missing result table or missing metric label aborts the
/// whole aggregation; no partial table is returned.
pub fn aggregate_sweep(outputs: &OutputLayout, scenario: &str, variable: &str) -> ResultsResult<KpiTable> {
    let manifest = SweepManifest::load(&outputs.sweep_manifest(scenario, variable))?;
    let scenario_dir = outputs.scenario_dir(scenario);
    let mut table = KpiTable::new();

    for step in &manifest.steps {
        if step.status != StepStatus::Succeeded {
            return Err(ResultsError::StepFailed {
                label: step.label.clone(),
                reason: step
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("status {:?}", step.status)),
            });
        }

        let step_dir = scenario_dir.join(&step.namespace);
        let files = ResultFiles::locate(&step_dir)?;
        let scalars = ScalarTable::read(&files.scalars)?;
        let costs = AssetMatrix::read(&files.cost_matrix)?;
        let capacities = AssetMatrix::read(&files.scalar_matrix)?;
        let assets = pv_assets(&step_dir)?;

        let values = KpiMetric::ALL
            .iter()
            .map(|m| -> ResultsResult<(KpiMetric, f64)> {
                Ok((*m, m.extract(&scalars, &costs, &capacities, &assets)?))
            })
            .collect::<ResultsResult<BTreeMap<_, _>>>()?;
        debug!(step = %step.label, pv_assets = assets.len(), "step aggregated");

        table.insert(
            step.index,
            KpiRow {
                year: step.year,
                step: step.value,
                values,
            },
        );
    }

    info!(scenario, variable, rows = table.len(), "KPIs aggregated");
    Ok(table)
}

/// Aggregate the same sweep variable across several scenarios.
pub fn aggregate_scenarios(
    outputs: &OutputLayout,
    scenarios: &[String],
    variable: &str,
) -> ResultsResult<BTreeMap<String, KpiTable>> {
    scenarios
        .iter()
        .map(|s| -> ResultsResult<(String, KpiTable)> {
            Ok((s.clone(), aggregate_sweep(outputs, s, variable)?))
        })
        .collect()
}

/// Export several scenario tables into one CSV with a leading `scenario` column.
pub fn write_scenarios_csv(path: &Path, tables: &BTreeMap<String, KpiTable>) -> ResultsResult<()> {
    let mut file = create(path)?;
    {
        let mut wtr = csv::Writer::from_writer(&mut file);
        wtr.write_record(header_row(true))
            .map_err(|source| ResultsError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
        wtr.flush().map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    for (scenario, table) in tables {
        table.write_rows(&mut file, path, Some(scenario), false)?;
    }
    Ok(())
}
