//! Declared column ownership.

use std::fmt;

/// Which columns of a table a declaration covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    Exact(String),
    Prefix(String),
}

impl ColumnSelector {
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    pub fn matches(&self, column: &str) -> bool {
        match self {
            Self::Exact(name) => column == name,
            Self::Prefix(prefix) => column.starts_with(prefix.as_str()),
        }
    }

    /// Whether some column name could match both selectors.
    pub fn overlaps(&self, other: &ColumnSelector) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Exact(a), Self::Prefix(p)) | (Self::Prefix(p), Self::Exact(a)) => {
                a.starts_with(p.as_str())
            }
            (Self::Prefix(a), Self::Prefix(b)) => {
                a.starts_with(b.as_str()) || b.starts_with(a.as_str())
            }
        }
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => write!(f, "column '{name}'"),
            Self::Prefix(prefix) => write!(f, "columns '{prefix}*'"),
        }
    }
}

/// A (table, columns) pair a stage may write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOwnership {
    pub table: String,
    pub selector: ColumnSelector,
}

impl ColumnOwnership {
    pub fn new(table: impl Into<String>, selector: ColumnSelector) -> Self {
        Self {
            table: table.into(),
            selector,
        }
    }

    pub fn covers(&self, table: &str, column: &str) -> bool {
        self.table == table && self.selector.matches(column)
    }

    pub fn conflicts_with(&self, other: &ColumnOwnership) -> bool {
        self.table == other.table && self.selector.overlaps(&other.selector)
    }
}
