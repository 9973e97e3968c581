use serde::Deserialize;

use pf_project::tables::ENERGY_PROVIDERS;

use crate::context::StageContext;
use crate::error::{PipelineError, PipelineResult};
use crate::ownership::{ColumnOwnership, ColumnSelector};
use crate::stage::{Concern, Stage};

pub const GRID_PARAMETERS_FILE: &str = "local_grid_parameters.csv";
pub const GRID_COLUMN: &str = "Electricity grid";

#[derive(Debug, Deserialize)]
struct GridParameters {
    country: String,
    energy_price: f64,
    feedin_tariff: f64,
    emission_factor: f64,
    renewable_share: f64,
}

/// Country-specific prices, tariffs and emission factors for the grid provider.
pub struct GridStage;

impl GridStage {
    const NAME: &'static str = "grid";

    fn lookup(ctx: &StageContext) -> PipelineResult<GridParameters> {
        let path = ctx.inputs().static_inputs.join(GRID_PARAMETERS_FILE);
        if !path.is_file() {
            return Err(PipelineError::MissingInput {
                stage: Self::NAME,
                what: format!("{} not found", path.display()),
            });
        }
        let csv_err = |source| PipelineError::Csv {
            path: path.clone(),
            source,
        };

        let country = &ctx.location().country;
        let mut rdr = csv::Reader::from_path(&path).map_err(csv_err)?;
        for row in rdr.deserialize::<GridParameters>() {
            let row = row.map_err(csv_err)?;
            if row.country.eq_ignore_ascii_case(country) {
                return Ok(row);
            }
        }
        Err(PipelineError::MissingInput {
            stage: Self::NAME,
            what: format!("no grid parameters for country '{country}'"),
        })
    }
}

impl Stage for GridStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn concern(&self) -> Option<Concern> {
        Some(Concern::Grid)
    }

    fn writes(&self) -> Vec<ColumnOwnership> {
        vec![ColumnOwnership::new(
            ENERGY_PROVIDERS,
            ColumnSelector::exact(GRID_COLUMN),
        )]
    }

    fn applies(&self, ctx: &mut StageContext) -> PipelineResult<bool> {
        Ok(ctx.has_table(ENERGY_PROVIDERS) && ctx.table(ENERGY_PROVIDERS)?.has_column(GRID_COLUMN))
    }

    fn run(&self, ctx: &mut StageContext) -> PipelineResult<()> {
        let params = Self::lookup(ctx)?;
        for (row, value) in [
            ("energy_price", params.energy_price),
            ("feedin_tariff", params.feedin_tariff),
            ("emission_factor", params.emission_factor),
            ("renewable_share", params.renewable_share),
        ] {
            ctx.set(ENERGY_PROVIDERS, row, GRID_COLUMN, &value.to_string())?;
        }
        Ok(())
    }
}
