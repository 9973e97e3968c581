//! Hourly weather series.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use pf_core::format_coordinate;
use serde::{Deserialize, Serialize};

use crate::{WeatherError, WeatherResult};

/// Cache key of a weather series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherKey {
    pub latitude: f64,
    pub longitude: f64,
    pub year: i32,
}

impl WeatherKey {
    pub fn new(latitude: f64, longitude: f64, year: i32) -> Self {
        Self {
            latitude,
            longitude,
            year,
        }
    }

    /// `weatherdata_<lat>_<lon>_<year>.csv`
    pub fn file_name(&self) -> String {
        format!(
            "weatherdata_{}_{}_{}.csv",
            format_coordinate(self.latitude),
            format_coordinate(self.longitude),
            self.year
        )
    }

    pub fn same_place(&self, latitude: f64, longitude: f64) -> bool {
        self.latitude == latitude && self.longitude == longitude
    }
}

impl fmt::Display for WeatherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) {}",
            format_coordinate(self.latitude),
            format_coordinate(self.longitude),
            self.year
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    #[serde(with = "timestamp", alias = "")]
    pub time: NaiveDateTime,
    pub ghi: f64,
    pub dni: f64,
    pub dhi: f64,
    pub temp_air: f64,
    pub wind_speed: f64,
    pub precipitable_water: f64,
}

/// Weather series for one location and year. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSeries {
    key: WeatherKey,
    records: Vec<WeatherRecord>,
}

impl WeatherSeries {
    pub fn new(key: WeatherKey, records: Vec<WeatherRecord>) -> Self {
        Self { key, records }
    }

    pub fn key(&self) -> &WeatherKey {
        &self.key
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn times(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.records.iter().map(|r| r.time)
    }

    pub fn ghi(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.ghi)
    }

    pub fn temp_air(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.temp_air)
    }

    pub fn read_csv(path: &Path, key: WeatherKey) -> WeatherResult<Self> {
        let csv_err = |source| WeatherError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut rdr = csv::Reader::from_path(path).map_err(csv_err)?;
        let mut records = Vec::new();
        for record in rdr.deserialize() {
            records.push(record.map_err(csv_err)?);
        }
        if records.is_empty() {
            return Err(WeatherError::InvalidFile {
                path: path.to_path_buf(),
                message: "no weather records".to_string(),
            });
        }
        Ok(Self { key, records })
    }

    pub fn write_csv(&self, path: &Path) -> WeatherResult<()> {
        let csv_err = |source| WeatherError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
        for record in &self.records {
            wtr.serialize(record).map_err(csv_err)?;
        }
        wtr.flush().map_err(WeatherError::io(path))
    }
}

mod timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("bad timestamp '{raw}'")))
    }

    pub(super) fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .ok()
            .or_else(|| {
                DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z")
                    .or_else(|_| DateTime::parse_from_rfc3339(raw))
                    .ok()
                    .map(|dt| dt.naive_utc())
            })
    }
}
