use std::fmt;

use pf_core::{OverwritePolicies, OverwritePolicy};

use crate::context::StageContext;
use crate::error::PipelineResult;
use crate::ownership::ColumnOwnership;

/// Preparation concern a stage's overwrite policy is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concern {
    Grid,
    Pv,
    Heat,
}

impl Concern {
    pub fn policy(self, policies: &OverwritePolicies) -> OverwritePolicy {
        match self {
            Concern::Grid => policies.grid,
            Concern::Pv => policies.pv,
            Concern::Heat => policies.heat,
        }
    }
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concern::Grid => write!(f, "grid"),
            Concern::Pv => write!(f, "pv"),
            Concern::Heat => write!(f, "heat"),
        }
    }
}

/// One step of input preparation.
pub trait Stage: Send + Sync {
    /// Identifier for logs and error messages.
    fn name(&self) -> &'static str;

    /// Concern whose overwrite policy applies. `None` means always preserve.
    fn concern(&self) -> Option<Concern>;

    /// Every (table, columns) this stage may write.
    fn writes(&self) -> Vec<ColumnOwnership>;

    /// Whether the stage has anything to do for this scenario.
    fn applies(&self, _ctx: &mut StageContext) -> PipelineResult<bool> {
        Ok(true)
    }

    fn run(&self, ctx: &mut StageContext) -> PipelineResult<()>;
}
