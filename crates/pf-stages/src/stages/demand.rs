use std::path::Path;
use std::sync::Arc;

use pf_core::CellUpdate;
use pf_project::tables::ENERGY_CONSUMPTION;

use super::model_error;
use crate::context::StageContext;
use crate::error::{PipelineError, PipelineResult};
use crate::models::DemandModel;
use crate::ownership::{ColumnOwnership, ColumnSelector};
use crate::stage::{Concern, Stage};

const ELECTRICITY: &str = "Electricity demand";
const HEAT: &str = "Heat demand";

/// Electricity and heat load series for `energyConsumption`.
///
/// Demand has no overwrite concern: an existing file reference is never replaced.
pub struct DemandStage {
    model: Arc<dyn DemandModel>,
}

impl DemandStage {
    const NAME: &'static str = "demand";

    pub fn new(model: Arc<dyn DemandModel>) -> Self {
        Self { model }
    }

    fn write_override(ctx: &mut StageContext, column: &str, source: &Path) -> PipelineResult<CellUpdate> {
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::MissingInput {
                stage: Self::NAME,
                what: format!("demand override {} has no file name", source.display()),
            })?
            .to_string();
        let outcome = ctx.set(ENERGY_CONSUMPTION, "file_name", column, &file_name)?;
        if outcome.is_write() || outcome == CellUpdate::Unchanged {
            ctx.stage_copy(source, &file_name)?;
        }
        Ok(outcome)
    }
}

impl Stage for DemandStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn concern(&self) -> Option<Concern> {
        None
    }

    fn writes(&self) -> Vec<ColumnOwnership> {
        vec![
            ColumnOwnership::new(ENERGY_CONSUMPTION, ColumnSelector::exact(ELECTRICITY)),
            ColumnOwnership::new(ENERGY_CONSUMPTION, ColumnSelector::exact(HEAT)),
        ]
    }

    fn applies(&self, ctx: &mut StageContext) -> PipelineResult<bool> {
        if !ctx.has_table(ENERGY_CONSUMPTION) {
            return Ok(false);
        }
        let table = ctx.table(ENERGY_CONSUMPTION)?;
        Ok(table.has_column(ELECTRICITY) || table.has_column(HEAT))
    }

    fn run(&self, ctx: &mut StageContext) -> PipelineResult<()> {
        let location = ctx.location().clone();
        let storeys = ctx.inputs().storeys;
        let overrides = ctx.inputs().demand_overrides.clone();
        let suffix = format!("{}_{}_{storeys}", location.year, location.country.to_lowercase());
        let err = model_error(Self::NAME);
        let (has_electricity, has_heat) = {
            let table = ctx.table(ENERGY_CONSUMPTION)?;
            (table.has_column(ELECTRICITY), table.has_column(HEAT))
        };

        if has_electricity {
            match &overrides.electricity {
                Some(path) => {
                    Self::write_override(ctx, ELECTRICITY, path)?;
                }
                None => {
                    let load = self
                        .model
                        .electricity(&location, storeys, ctx.weather())
                        .map_err(&err)?;
                    let file_name = format!("electricity_load_{suffix}.csv");
                    ctx.set_series(ENERGY_CONSUMPTION, "file_name", ELECTRICITY, &file_name, "kWh", &load)?;
                }
            }
        }

        if has_heat {
            match &overrides.heat {
                Some(path) => {
                    Self::write_override(ctx, HEAT, path)?;
                }
                None => {
                    let load = self
                        .model
                        .heat(&location, storeys, ctx.weather())
                        .map_err(&err)?;
                    let file_name = format!("heat_load_{suffix}.csv");
                    ctx.set_series(ENERGY_CONSUMPTION, "file_name", HEAT, &file_name, "kWh", &load)?;
                }
            }
        }
        Ok(())
    }
}
