//! Sidecar index of cached weather files.
//!
//! Each cached file gets an entry with its key and a content fingerprint, so
//! cross-year discovery never has to parse years back out of file names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::series::WeatherKey;
use crate::{WeatherError, WeatherResult};

pub const INDEX_FILE: &str = "weather_index.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub latitude: f64,
    pub longitude: f64,
    pub year: i32,
    pub file: String,
    pub sha256: String,
}

impl IndexEntry {
    pub fn key(&self) -> WeatherKey {
        WeatherKey::new(self.latitude, self.longitude, self.year)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherIndex {
    pub entries: Vec<IndexEntry>,
}

impl WeatherIndex {
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    pub fn load(dir: &Path) -> WeatherResult<Self> {
        let path = Self::path(dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(WeatherError::io(&path))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, dir: &Path) -> WeatherResult<()> {
        let path = Self::path(dir);
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content).map_err(WeatherError::io(&path))
    }

    /// Insert or replace the entry for `entry`'s key.
    pub fn record(&mut self, entry: IndexEntry) {
        let key = entry.key();
        self.entries.retain(|e| e.key() != key);
        self.entries.push(entry);
        self.entries
            .sort_by(|a, b| a.file.cmp(&b.file).then(a.year.cmp(&b.year)));
    }

    pub fn find(&self, key: &WeatherKey) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.key() == *key)
    }

    /// Cached years for a location, ascending.
    pub fn years_for(&self, latitude: f64, longitude: f64) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .entries
            .iter()
            .filter(|e| e.key().same_place(latitude, longitude))
            .map(|e| e.year)
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}

/// Hex SHA-256 of a file's content.
pub fn fingerprint(path: &Path) -> WeatherResult<String> {
    let bytes = std::fs::read(path).map_err(WeatherError::io(path))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(year: i32) -> IndexEntry {
        let key = WeatherKey::new(40.416775, -3.70379, year);
        IndexEntry {
            latitude: key.latitude,
            longitude: key.longitude,
            year,
            file: key.file_name(),
            sha256: "00".to_string(),
        }
    }

    #[test]
    fn record_replaces_same_key() {
        let mut index = WeatherIndex::default();
        index.record(entry(2015));
        let mut updated = entry(2015);
        updated.sha256 = "ff".to_string();
        index.record(updated);
        assert_eq!(index.entries.len(), 1);
        assert_eq!(index.entries[0].sha256, "ff");
    }

    #[test]
    fn years_are_sorted_and_filtered_by_place() {
        let mut index = WeatherIndex::default();
        index.record(entry(2017));
        index.record(entry(2013));
        index.record(IndexEntry {
            latitude: 52.52437,
            longitude: 13.41053,
            year: 2011,
            file: "weatherdata_52.52437_13.41053_2011.csv".to_string(),
            sha256: "00".to_string(),
        });
        assert_eq!(index.years_for(40.416775, -3.70379), vec![2013, 2017]);
        assert_eq!(index.years_for(52.52437, 13.41053), vec![2011]);
    }
}
