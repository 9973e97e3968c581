//! Annual weather summaries for comparing simulation years.

use serde::Serialize;

use crate::WeatherResult;
use crate::index::WeatherIndex;
use crate::series::WeatherSeries;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub ghi_sum: f64,
    pub dni_sum: f64,
    pub dhi_sum: f64,
    pub temp_air_mean: f64,
}

impl YearSummary {
    pub fn from_series(series: &WeatherSeries) -> Self {
        let records = series.records();
        let n = records.len().max(1) as f64;
        Self {
            year: series.key().year,
            ghi_sum: records.iter().map(|r| r.ghi).sum(),
            dni_sum: records.iter().map(|r| r.dni).sum(),
            dhi_sum: records.iter().map(|r| r.dhi).sum(),
            temp_air_mean: records.iter().map(|r| r.temp_air).sum::<f64>() / n,
        }
    }
}

/// Summaries for every cached year of a location, ascending by year.
pub fn summarize_years(dir: &Path, latitude: f64, longitude: f64) -> WeatherResult<Vec<YearSummary>> {
    let index = WeatherIndex::load(dir)?;
    let mut out = Vec::new();
    for entry in index
        .entries
        .iter()
        .filter(|e| e.key().same_place(latitude, longitude))
    {
        let series = WeatherSeries::read_csv(&dir.join(&entry.file), entry.key())?;
        out.push(YearSummary::from_series(&series));
    }
    out.sort_by_key(|s| s.year);
    Ok(out)
}
