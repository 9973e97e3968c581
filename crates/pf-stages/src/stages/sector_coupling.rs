use std::sync::Arc;

use pf_project::tables::ENERGY_CONVERSION;

use super::{model_error, series_stem};
use crate::context::StageContext;
use crate::error::PipelineResult;
use crate::models::HeatPumpModel;
use crate::ownership::{ColumnOwnership, ColumnSelector};
use crate::stage::{Concern, Stage};

const DEVICE_PREFIXES: [&str; 2] = ["Heat pump", "Chiller"];

/// COP series for heat pumps and chillers declared in `energyConversion`.
pub struct SectorCouplingStage {
    model: Arc<dyn HeatPumpModel>,
}

impl SectorCouplingStage {
    const NAME: &'static str = "sector_coupling";

    pub fn new(model: Arc<dyn HeatPumpModel>) -> Self {
        Self { model }
    }

    fn devices(ctx: &mut StageContext) -> PipelineResult<Vec<String>> {
        if !ctx.has_table(ENERGY_CONVERSION) {
            return Ok(Vec::new());
        }
        Ok(ctx
            .table(ENERGY_CONVERSION)?
            .columns()
            .iter()
            .filter(|c| DEVICE_PREFIXES.iter().any(|p| c.starts_with(p)))
            .cloned()
            .collect())
    }
}

impl Stage for SectorCouplingStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn concern(&self) -> Option<Concern> {
        Some(Concern::Heat)
    }

    fn writes(&self) -> Vec<ColumnOwnership> {
        DEVICE_PREFIXES
            .iter()
            .map(|p| ColumnOwnership::new(ENERGY_CONVERSION, ColumnSelector::prefix(*p)))
            .collect()
    }

    fn applies(&self, ctx: &mut StageContext) -> PipelineResult<bool> {
        Ok(!Self::devices(ctx)?.is_empty())
    }

    fn run(&self, ctx: &mut StageContext) -> PipelineResult<()> {
        let cop = self
            .model
            .cop(ctx.weather())
            .map_err(model_error(Self::NAME))?;
        let year = ctx.location().year;

        for device in Self::devices(ctx)? {
            let file_name = format!("cop_{}_{year}.csv", series_stem(&device));
            ctx.set_series(ENERGY_CONVERSION, "efficiency", &device, &file_name, "no_unit", &cop)?;
        }
        Ok(())
    }
}
