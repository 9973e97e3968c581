//! Ordered stage execution with a composition-time ownership check.

use pf_core::OverwritePolicy;
use tracing::{debug, info};

use crate::context::{StageContext, UpdateCounts};
use crate::error::{PipelineError, PipelineResult};
use crate::models::StageModels;
use crate::stage::Stage;
use crate::stages::{DemandStage, GridStage, PvStage, SectorCouplingStage, ThermalStorageStage};

/// Collects stages and validates their declared ownership.
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Reject the pipeline if two stages may write the same column.
    pub fn build(self) -> PipelineResult<Pipeline> {
        let declared: Vec<_> = self
            .stages
            .iter()
            .map(|s| (s.name(), s.writes()))
            .collect();

        for (i, (first, first_writes)) in declared.iter().enumerate() {
            for (second, second_writes) in &declared[i + 1..] {
                for a in first_writes {
                    if let Some(b) = second_writes.iter().find(|b| a.conflicts_with(b)) {
                        return Err(PipelineError::OwnershipConflict {
                            first: *first,
                            second: *second,
                            table: a.table.clone(),
                            first_selector: a.selector.clone(),
                            second_selector: b.selector.clone(),
                        });
                    }
                }
            }
        }

        Ok(Pipeline {
            stages: self.stages,
        })
    }
}

/// A validated sequence of stages.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Grid, PV, sector coupling, demand, thermal storage.
    pub fn standard(models: &StageModels) -> PipelineResult<Self> {
        Self::builder()
            .with_stage(GridStage)
            .with_stage(PvStage::new(models.pv.clone()))
            .with_stage(SectorCouplingStage::new(models.heat_pump.clone()))
            .with_stage(DemandStage::new(models.demand.clone()))
            .with_stage(ThermalStorageStage::new(models.storage.clone()))
            .build()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every applicable stage, then persist the modified tables.
    ///
    /// Tables are only written back when all stages succeed.
    pub fn run(&self, ctx: &mut StageContext) -> PipelineResult<PipelineReport> {
        let mut report = PipelineReport::default();
        let policies = ctx.inputs().policies;

        for stage in &self.stages {
            let name = stage.name();
            if !stage.applies(ctx)? {
                debug!(stage = name, "stage skipped");
                report.stages.push(StageReport {
                    name,
                    ran: false,
                    counts: UpdateCounts::default(),
                });
                continue;
            }

            let policy = stage
                .concern()
                .map(|c| c.policy(&policies))
                .unwrap_or(OverwritePolicy::Preserve);
            ctx.begin_stage(name, stage.writes(), policy);
            let result = stage.run(ctx);
            let counts = ctx.end_stage();
            result?;

            info!(
                stage = name,
                %policy,
                filled = counts.filled,
                overwritten = counts.overwritten,
                preserved = counts.preserved,
                "stage complete"
            );
            report.stages.push(StageReport {
                name,
                ran: true,
                counts,
            });
        }

        ctx.flush()?;
        Ok(report)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub name: &'static str,
    pub ran: bool,
    pub counts: UpdateCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Cells filled or overwritten across all stages.
    pub fn total_writes(&self) -> usize {
        self.stages.iter().map(|s| s.counts.writes()).sum()
    }
}
