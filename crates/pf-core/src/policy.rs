//! Overwrite policies for values computed during input preparation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a stage does when the target cell already holds a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Keep existing values, only fill missing cells.
    Preserve,
    /// Replace existing values unconditionally.
    #[default]
    Overwrite,
}

impl OverwritePolicy {
    pub fn from_flag(overwrite: bool) -> Self {
        if overwrite {
            Self::Overwrite
        } else {
            Self::Preserve
        }
    }

    /// Decide the outcome of writing `new` over `existing`.
    ///
    /// `existing` is `None` when the cell is absent or holds a missing marker.
    pub fn decide(self, existing: Option<&str>, new: &str) -> CellUpdate {
        match (existing, self) {
            (None, _) => CellUpdate::Filled,
            (Some(old), _) if old == new => CellUpdate::Unchanged,
            (Some(_), OverwritePolicy::Preserve) => CellUpdate::Preserved,
            (Some(_), OverwritePolicy::Overwrite) => CellUpdate::Overwritten,
        }
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preserve => write!(f, "preserve"),
            Self::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// One policy per preparation concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverwritePolicies {
    /// Local grid prices, tariffs and emission factors.
    pub grid: OverwritePolicy,
    /// PV asset parameters and feed-in series.
    pub pv: OverwritePolicy,
    /// Heat pump COP and thermal storage losses.
    pub heat: OverwritePolicy,
}

impl OverwritePolicies {
    pub fn uniform(policy: OverwritePolicy) -> Self {
        Self {
            grid: policy,
            pv: policy,
            heat: policy,
        }
    }
}

/// Outcome of a single cell write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellUpdate {
    Filled,
    Overwritten,
    Preserved,
    Unchanged,
    /// The cell is pinned and was not touched.
    Pinned,
}

impl CellUpdate {
    pub fn is_write(self) -> bool {
        matches!(self, CellUpdate::Filled | CellUpdate::Overwritten)
    }
}
