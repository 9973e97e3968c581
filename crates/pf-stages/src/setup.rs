//! PV setup table (`pv_setup.csv`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

pub const PV_SETUP_FILE: &str = "pv_setup.csv";

/// One PV installation of the building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvSetup {
    /// `flat_roof`, `gable_roof`, `south_facade`, ...
    pub surface_type: String,
    /// `si`, `cpv` or `psi`
    pub technology: String,
    pub surface_azimuth: f64,
    /// 0 is vertical.
    pub surface_tilt: f64,
}

pub fn read_pv_setup(dir: &Path) -> PipelineResult<Vec<PvSetup>> {
    let path = dir.join(PV_SETUP_FILE);
    if !path.is_file() {
        return Err(PipelineError::MissingInput {
            stage: "pv",
            what: format!("{} not found", path.display()),
        });
    }
    let csv_err = |source| PipelineError::Csv {
        path: path.clone(),
        source,
    };
    let mut rdr = csv::Reader::from_path(&path).map_err(csv_err)?;
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row.map_err(csv_err)?);
    }
    Ok(rows)
}

/// Asset column names, one per setup row.
///
/// `PV <technology>` when the technology is used once, otherwise
/// `PV <technology>_<surface_type>`.
pub fn asset_columns(setup: &[PvSetup]) -> Vec<String> {
    setup
        .iter()
        .map(|row| {
            let shared = setup
                .iter()
                .filter(|other| other.technology == row.technology)
                .count()
                > 1;
            if shared {
                format!("PV {}_{}", row.technology, row.surface_type)
            } else {
                format!("PV {}", row.technology)
            }
        })
        .collect()
}
