use std::sync::Arc;

use pf_project::tables::STORAGE_THERMAL;

use super::model_error;
use crate::context::StageContext;
use crate::error::PipelineResult;
use crate::models::StorageModel;
use crate::ownership::{ColumnOwnership, ColumnSelector};
use crate::stage::{Concern, Stage};

pub const STORAGE_COLUMN: &str = "storage capacity";

/// Temperature-dependent fixed losses of the stratified thermal storage.
pub struct ThermalStorageStage {
    model: Arc<dyn StorageModel>,
}

impl ThermalStorageStage {
    const NAME: &'static str = "thermal_storage";

    pub fn new(model: Arc<dyn StorageModel>) -> Self {
        Self { model }
    }
}

impl Stage for ThermalStorageStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn concern(&self) -> Option<Concern> {
        Some(Concern::Heat)
    }

    fn writes(&self) -> Vec<ColumnOwnership> {
        vec![ColumnOwnership::new(
            STORAGE_THERMAL,
            ColumnSelector::exact(STORAGE_COLUMN),
        )]
    }

    fn applies(&self, ctx: &mut StageContext) -> PipelineResult<bool> {
        Ok(ctx.has_table(STORAGE_THERMAL) && ctx.table(STORAGE_THERMAL)?.has_column(STORAGE_COLUMN))
    }

    fn run(&self, ctx: &mut StageContext) -> PipelineResult<()> {
        let err = model_error(Self::NAME);
        let relative = self.model.losses_relative(ctx.weather()).map_err(&err)?;
        let absolute = self.model.losses_absolute(ctx.weather()).map_err(&err)?;
        let year = ctx.location().year;

        for (row, values) in [
            ("fixed_thermal_losses_relative", &relative),
            ("fixed_thermal_losses_absolute", &absolute),
        ] {
            let file_name = format!("{row}_{year}.csv");
            ctx.set_series(STORAGE_THERMAL, row, STORAGE_COLUMN, &file_name, "no_unit", values)?;
        }
        Ok(())
    }
}
