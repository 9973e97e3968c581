//! Result tables written by the optimization engine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{ResultsError, ResultsResult};

pub const SCALARS: &str = "scalars.csv";
pub const COST_MATRIX: &str = "cost_matrix.csv";
pub const SCALAR_MATRIX: &str = "scalar_matrix.csv";

/// The three result tables of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFiles {
    pub scalars: PathBuf,
    pub cost_matrix: PathBuf,
    pub scalar_matrix: PathBuf,
}

impl ResultFiles {
    /// Check that every result table exists under `dir`.
    pub fn locate(dir: &Path) -> ResultsResult<Self> {
        let find = |name: &str| {
            let path = dir.join(name);
            if path.is_file() {
                Ok(path)
            } else {
                Err(ResultsError::MissingFile { path })
            }
        };
        Ok(Self {
            scalars: find(SCALARS)?,
            cost_matrix: find(COST_MATRIX)?,
            scalar_matrix: find(SCALAR_MATRIX)?,
        })
    }
}

fn open(path: &Path) -> ResultsResult<csv::Reader<std::fs::File>> {
    if !path.is_file() {
        return Err(ResultsError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    csv::Reader::from_path(path).map_err(|source| ResultsError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

fn parse(path: &Path, label: &str, value: &str) -> ResultsResult<f64> {
    value.trim().parse().map_err(|_| ResultsError::NotANumber {
        path: path.to_path_buf(),
        label: label.to_string(),
        value: value.to_string(),
    })
}

/// `scalars.csv`: one KPI per row, label in the first column, value in the second.
#[derive(Debug, Clone)]
pub struct ScalarTable {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl ScalarTable {
    pub fn read(path: &Path) -> ResultsResult<Self> {
        let mut rdr = open(path)?;
        let mut values = BTreeMap::new();
        for record in rdr.records() {
            let record = record.map_err(|source| ResultsError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            if let (Some(label), Some(value)) = (record.get(0), record.get(1)) {
                values.insert(label.trim().to_string(), value.to_string());
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn value(&self, label: &str) -> ResultsResult<f64> {
        let raw = self
            .values
            .get(label)
            .ok_or_else(|| ResultsError::MissingLabel {
                path: self.path.clone(),
                label: label.to_string(),
            })?;
        parse(&self.path, label, raw)
    }
}

/// `cost_matrix.csv` / `scalar_matrix.csv`: one asset per row, keyed by the `label` column.
#[derive(Debug, Clone)]
pub struct AssetMatrix {
    path: PathBuf,
    rows: BTreeMap<String, BTreeMap<String, String>>,
}

impl AssetMatrix {
    const KEY: &'static str = "label";

    pub fn read(path: &Path) -> ResultsResult<Self> {
        let csv_err = |source| ResultsError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut rdr = open(path)?;
        let headers = rdr.headers().map_err(csv_err)?.clone();
        // Fall back to the first column for matrices written without a label header.
        let key = headers.iter().position(|h| h == Self::KEY).unwrap_or(0);

        let mut rows = BTreeMap::new();
        for record in rdr.records() {
            let record = record.map_err(csv_err)?;
            let Some(asset) = record.get(key) else {
                continue;
            };
            let cells = headers
                .iter()
                .zip(record.iter())
                .enumerate()
                .filter(|(i, _)| *i != key)
                .map(|(_, (h, v))| (h.to_string(), v.to_string()))
                .collect();
            rows.insert(asset.trim().to_string(), cells);
        }
        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn value(&self, asset: &str, column: &str) -> ResultsResult<f64> {
        let label = format!("{asset}/{column}");
        let raw = self
            .rows
            .get(asset)
            .and_then(|row| row.get(column))
            .ok_or_else(|| ResultsError::MissingLabel {
                path: self.path.clone(),
                label: label.clone(),
            })?;
        parse(&self.path, &label, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pf_results_files_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn asset_matrix_is_keyed_by_label_column() {
        let dir = scratch("matrix");
        let path = dir.join(COST_MATRIX);
        std::fs::write(
            &path,
            ",label,costs_total,levelized_cost_of_energy_of_asset\n0,PV si,1200.5,0.081\n1,Electricity grid,300,0.3\n",
        )
        .unwrap();

        let matrix = AssetMatrix::read(&path).unwrap();
        assert_eq!(matrix.value("PV si", "costs_total").unwrap(), 1200.5);
        assert_eq!(matrix.assets().count(), 2);
        assert!(matches!(
            matrix.value("PV cpv", "costs_total"),
            Err(ResultsError::MissingLabel { .. })
        ));
    }

    #[test]
    fn scalar_values_are_parsed() {
        let dir = scratch("scalars");
        let path = dir.join(SCALARS);
        std::fs::write(&path, ",0\nRenewable factor,0.42\nDegree of NZE,n/a\n").unwrap();

        let scalars = ScalarTable::read(&path).unwrap();
        assert_eq!(scalars.value("Renewable factor").unwrap(), 0.42);
        assert!(matches!(
            scalars.value("Degree of NZE"),
            Err(ResultsError::NotANumber { .. })
        ));
    }

    #[test]
    fn locate_requires_every_table() {
        let dir = scratch("locate");
        std::fs::write(dir.join(SCALARS), ",0\n").unwrap();
        std::fs::write(dir.join(COST_MATRIX), ",label\n").unwrap();
        let err = ResultFiles::locate(&dir).unwrap_err();
        assert!(matches!(err, ResultsError::MissingFile { path } if path.ends_with(SCALAR_MATRIX)));
    }
}
