//! Persisted project metadata (`project_data.csv`, `simulation_settings.csv`).

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use pf_core::{LabeledTable, format_coordinate};

use crate::layout::{InputLayout, tables};
use crate::{ProjectError, ProjectResult};

const PROJECT_COLUMN: &str = "project_data";
const SETTINGS_COLUMN: &str = "simulation_settings";
const START_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct ProjectMetadata {
    layout: InputLayout,
    project_data: LabeledTable,
    simulation_settings: LabeledTable,
}

impl ProjectMetadata {
    /// Load both metadata tables, starting empty ones if they do not exist yet.
    pub fn load(layout: &InputLayout) -> ProjectResult<Self> {
        let project_data = load_or_empty(layout, tables::PROJECT_DATA, PROJECT_COLUMN)?;
        let simulation_settings =
            load_or_empty(layout, tables::SIMULATION_SETTINGS, SETTINGS_COLUMN)?;
        Ok(Self {
            layout: layout.clone(),
            project_data,
            simulation_settings,
        })
    }

    pub fn latitude(&self) -> ProjectResult<Option<f64>> {
        self.number("latitude")
    }

    pub fn longitude(&self) -> ProjectResult<Option<f64>> {
        self.number("longitude")
    }

    pub fn country(&self) -> Option<String> {
        self.project_data
            .get("country", PROJECT_COLUMN)
            .map(|s| s.trim().to_string())
    }

    pub fn scenario_name(&self) -> Option<&str> {
        self.project_data.get("scenario_name", PROJECT_COLUMN)
    }

    /// Simulation year, taken from `start_date`.
    pub fn year(&self) -> ProjectResult<Option<i32>> {
        let Some(raw) = self.simulation_settings.get("start_date", SETTINGS_COLUMN) else {
            return Ok(None);
        };
        parse_start_year(raw).map(Some)
    }

    pub fn set_location(&mut self, latitude: f64, longitude: f64, country: &str, year: i32) {
        self.project_data
            .set("latitude", PROJECT_COLUMN, format_coordinate(latitude));
        self.project_data
            .set("longitude", PROJECT_COLUMN, format_coordinate(longitude));
        self.project_data.set("country", PROJECT_COLUMN, country);
        self.simulation_settings.set(
            "start_date",
            SETTINGS_COLUMN,
            format!("{year}-01-01 00:00:00"),
        );
    }

    pub fn set_scenario_name(&mut self, scenario: &str) {
        self.project_data
            .set("scenario_name", PROJECT_COLUMN, scenario);
    }

    pub fn save(&self) -> ProjectResult<()> {
        self.layout.write_table(&self.project_data)?;
        self.layout.write_table(&self.simulation_settings)?;
        Ok(())
    }

    fn number(&self, row: &str) -> ProjectResult<Option<f64>> {
        if self.project_data.get(row, PROJECT_COLUMN).is_none() {
            return Ok(None);
        }
        Ok(Some(self.project_data.get_f64(row, PROJECT_COLUMN)?))
    }
}

fn load_or_empty(layout: &InputLayout, name: &str, column: &str) -> ProjectResult<LabeledTable> {
    if layout.has_table(name) {
        return layout.read_table(name);
    }
    let mut table = LabeledTable::new(name, "label");
    table.ensure_column("unit");
    table.ensure_column(column);
    Ok(table)
}

fn parse_start_year(raw: &str) -> ProjectResult<i32> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, START_DATE_FORMAT)
        .map(|dt| dt.year())
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.year()))
        .map_err(|_| ProjectError::Invalid {
            what: format!("start_date '{raw}' is not a date"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_year_parsing() {
        assert_eq!(parse_start_year("2017-01-01 00:00:00").unwrap(), 2017);
        assert_eq!(parse_start_year("2013-06-01").unwrap(), 2013);
        assert!(parse_start_year("next year").is_err());
    }
}
