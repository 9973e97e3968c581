use std::sync::Arc;

use pf_project::tables::ENERGY_PRODUCTION;
use tracing::debug;

use super::{model_error, series_stem};
use crate::context::StageContext;
use crate::error::PipelineResult;
use crate::models::PvYieldModel;
use crate::ownership::{ColumnOwnership, ColumnSelector};
use crate::setup::{asset_columns, read_pv_setup};
use crate::stage::{Concern, Stage};

/// Normalized feed-in series and installable capacity per PV asset.
pub struct PvStage {
    model: Arc<dyn PvYieldModel>,
}

impl PvStage {
    const NAME: &'static str = "pv";

    pub fn new(model: Arc<dyn PvYieldModel>) -> Self {
        Self { model }
    }
}

impl Stage for PvStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn concern(&self) -> Option<Concern> {
        Some(Concern::Pv)
    }

    fn writes(&self) -> Vec<ColumnOwnership> {
        vec![ColumnOwnership::new(
            ENERGY_PRODUCTION,
            ColumnSelector::prefix("PV"),
        )]
    }

    fn run(&self, ctx: &mut StageContext) -> PipelineResult<()> {
        let setup = match &ctx.inputs().pv_setup {
            Some(rows) => rows.clone(),
            None => read_pv_setup(&ctx.inputs().user_inputs)?,
        };
        let year = ctx.location().year;
        let storeys = ctx.inputs().storeys;
        let err = model_error(Self::NAME);

        for (row, column) in setup.iter().zip(asset_columns(&setup)) {
            let feedin = self
                .model
                .normalized_feedin(row, ctx.weather(), ctx.location())
                .map_err(&err)?;
            let capacity = self.model.maximum_capacity(row, storeys).map_err(&err)?;

            let stem = series_stem(&column);
            let file_name = format!("{stem}_{year}.csv");
            debug!(%column, %file_name, capacity, "pv asset");
            ctx.set_series(ENERGY_PRODUCTION, "file_name", &column, &file_name, "kW", &feedin)?;
            ctx.set(ENERGY_PRODUCTION, "maximumCap", &column, &capacity.to_string())?;
        }
        Ok(())
    }
}
