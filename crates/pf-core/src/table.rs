//! Labeled tables.
//!
//! Every file under `csv_elements/` has the same shape: the first column holds
//! the row label (a parameter name such as `lifetime`), the remaining header
//! cells name the columns (`unit`, then one column per asset). Cells are kept
//! as text so tables round-trip without reformatting values nobody touched.

use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::policy::{CellUpdate, OverwritePolicy};
use crate::{CoreError, CoreResult};

/// Whether a raw cell value counts as missing.
pub fn is_missing(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("nan") || v.eq_ignore_ascii_case("none")
}

/// Address of a single cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: String,
    pub column: String,
}

impl CellRef {
    pub fn new(row: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Row {
    label: String,
    cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    name: String,
    index_name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl LabeledTable {
    pub fn new(name: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index_name: index_name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn read_csv(path: &Path) -> CoreResult<Self> {
        let file = std::fs::File::open(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_reader(name, file, path)
    }

    pub fn from_reader(name: impl Into<String>, reader: impl Read, origin: &Path) -> CoreResult<Self> {
        let csv_err = |source| CoreError::Csv {
            path: origin.to_path_buf(),
            source,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers().map_err(csv_err)?.clone();
        let mut header_iter = headers.iter();
        let index_name = header_iter
            .next()
            .ok_or_else(|| CoreError::EmptyTable {
                path: origin.to_path_buf(),
            })?
            .to_string();

        let mut table = Self::new(name, index_name);
        for column in header_iter {
            table.add_column(column)?;
        }

        for record in rdr.records() {
            let record = record.map_err(csv_err)?;
            let mut fields = record.iter();
            let label = fields.next().unwrap_or_default().to_string();
            let mut cells: Vec<String> = fields.map(str::to_string).collect();
            cells.resize(table.columns.len(), String::new());
            table.rows.push(Row { label, cells });
        }

        Ok(table)
    }

    pub fn write_csv(&self, path: &Path) -> CoreResult<()> {
        let io_err = |source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = std::fs::File::create(path).map_err(io_err)?;
        self.to_writer(std::io::BufWriter::new(file), path)
    }

    pub fn to_writer(&self, writer: impl Write, origin: &Path) -> CoreResult<()> {
        let csv_err = |source| CoreError::Csv {
            path: origin.to_path_buf(),
            source,
        };
        let mut wtr = csv::WriterBuilder::new().from_writer(writer);

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(self.index_name.as_str());
        header.extend(self.columns.iter().map(String::as_str));
        wtr.write_record(&header).map_err(csv_err)?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(row.cells.len() + 1);
            record.push(row.label.as_str());
            record.extend(row.cells.iter().map(String::as_str));
            wtr.write_record(&record).map_err(csv_err)?;
        }

        wtr.flush().map_err(|source| CoreError::Io {
            path: PathBuf::from(origin),
            source,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.label.as_str())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn has_row(&self, row: &str) -> bool {
        self.row_index(row).is_some()
    }

    pub fn add_column(&mut self, column: &str) -> CoreResult<()> {
        if self.has_column(column) {
            return Err(CoreError::DuplicateColumn {
                table: self.name.clone(),
                column: column.to_string(),
            });
        }
        self.columns.push(column.to_string());
        for row in &mut self.rows {
            row.cells.push(String::new());
        }
        Ok(())
    }

    /// Add the column unless it already exists.
    pub fn ensure_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
            for row in &mut self.rows {
                row.cells.push(String::new());
            }
        }
    }

    fn ensure_row(&mut self, row: &str) -> usize {
        match self.row_index(row) {
            Some(i) => i,
            None => {
                self.rows.push(Row {
                    label: row.to_string(),
                    cells: vec![String::new(); self.columns.len()],
                });
                self.rows.len() - 1
            }
        }
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    fn row_index(&self, row: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.label == row)
    }

    /// Raw cell text, including missing markers.
    pub fn raw(&self, row: &str, column: &str) -> Option<&str> {
        let c = self.column_index(column)?;
        let r = self.row_index(row)?;
        Some(self.rows[r].cells[c].as_str())
    }

    /// Cell value, `None` if the cell is absent or missing.
    pub fn get(&self, row: &str, column: &str) -> Option<&str> {
        self.raw(row, column).filter(|v| !is_missing(v))
    }

    pub fn require(&self, row: &str, column: &str) -> CoreResult<&str> {
        self.get(row, column).ok_or_else(|| CoreError::MissingCell {
            table: self.name.clone(),
            row: row.to_string(),
            column: column.to_string(),
        })
    }

    pub fn get_f64(&self, row: &str, column: &str) -> CoreResult<f64> {
        let value = self.require(row, column)?;
        value.trim().parse().map_err(|_| CoreError::NotANumber {
            table: self.name.clone(),
            row: row.to_string(),
            column: column.to_string(),
            value: value.to_string(),
        })
    }

    /// Unconditionally set a cell, creating the row and column if needed.
    pub fn set(&mut self, row: &str, column: &str, value: impl Into<String>) {
        self.ensure_column(column);
        let c = self.column_index(column).unwrap_or_default();
        let r = self.ensure_row(row);
        self.rows[r].cells[c] = value.into();
    }

    /// Write a cell according to an overwrite policy.
    pub fn update(
        &mut self,
        row: &str,
        column: &str,
        value: &str,
        policy: OverwritePolicy,
    ) -> CellUpdate {
        let outcome = policy.decide(self.get(row, column), value);
        if outcome.is_write() {
            self.set(row, column, value);
        }
        outcome
    }

    /// Cells whose raw text differs between two tables.
    ///
    /// Cells present in only one table count as differing unless they are missing.
    pub fn diff(&self, other: &LabeledTable) -> Vec<CellRef> {
        let mut out = Vec::new();
        let mut columns: Vec<&String> = self.columns.iter().collect();
        columns.extend(other.columns.iter().filter(|c| !self.has_column(c)));
        let mut rows: Vec<&str> = self.row_labels().collect();
        rows.extend(other.row_labels().filter(|r| !self.has_row(r)));

        for row in &rows {
            for column in &columns {
                let a = self.raw(row, column).filter(|v| !is_missing(v));
                let b = other.raw(row, column).filter(|v| !is_missing(v));
                if a != b {
                    out.push(CellRef::new(*row, column.as_str()));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCTION: &str = "\
label,unit,PV psi,PV cpv
lifetime,year,20,25
specific_costs,currency/unit,,900
file_name,str,NaN,pv_cpv.csv
";

    fn production() -> LabeledTable {
        LabeledTable::from_reader(
            "energyProduction",
            PRODUCTION.as_bytes(),
            Path::new("energyProduction.csv"),
        )
        .unwrap()
    }

    #[test]
    fn parses_labels_and_columns() {
        let t = production();
        assert_eq!(t.columns(), &["unit", "PV psi", "PV cpv"]);
        assert_eq!(
            t.row_labels().collect::<Vec<_>>(),
            vec!["lifetime", "specific_costs", "file_name"]
        );
        assert_eq!(t.get("lifetime", "PV psi"), Some("20"));
        assert_eq!(t.get_f64("lifetime", "PV cpv").unwrap(), 25.0);
    }

    #[test]
    fn missing_markers_read_as_none() {
        let t = production();
        assert_eq!(t.get("specific_costs", "PV psi"), None);
        assert_eq!(t.get("file_name", "PV psi"), None);
        assert_eq!(t.raw("file_name", "PV psi"), Some("NaN"));
        assert!(matches!(
            t.require("file_name", "PV psi"),
            Err(CoreError::MissingCell { .. })
        ));
    }

    #[test]
    fn set_creates_rows_and_columns() {
        let mut t = production();
        t.set("maximumCap", "PV si", "12.5");
        assert_eq!(t.get("maximumCap", "PV si"), Some("12.5"));
        assert_eq!(t.get("lifetime", "PV si"), None);
    }

    #[test]
    fn update_respects_policy() {
        let mut t = production();
        let outcome = t.update("lifetime", "PV psi", "30", OverwritePolicy::Preserve);
        assert_eq!(outcome, CellUpdate::Preserved);
        assert_eq!(t.get("lifetime", "PV psi"), Some("20"));

        let outcome = t.update("specific_costs", "PV psi", "700", OverwritePolicy::Preserve);
        assert_eq!(outcome, CellUpdate::Filled);
        assert_eq!(t.get("specific_costs", "PV psi"), Some("700"));

        let outcome = t.update("lifetime", "PV psi", "30", OverwritePolicy::Overwrite);
        assert_eq!(outcome, CellUpdate::Overwritten);
        assert_eq!(t.get("lifetime", "PV psi"), Some("30"));
    }

    #[test]
    fn round_trips_through_csv_text() {
        let t = production();
        let mut buf = Vec::new();
        t.to_writer(&mut buf, Path::new("mem")).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, PRODUCTION);
    }

    #[test]
    fn diff_reports_changed_cells_only() {
        let a = production();
        let mut b = production();
        assert!(a.diff(&b).is_empty());

        b.set("lifetime", "PV psi", "7");
        assert_eq!(a.diff(&b), vec![CellRef::new("lifetime", "PV psi")]);
    }

    #[test]
    fn duplicate_column_rejected() {
        let mut t = production();
        assert!(matches!(
            t.add_column("PV psi"),
            Err(CoreError::DuplicateColumn { .. })
        ));
    }
}
