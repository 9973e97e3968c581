use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    ResolvingLocation,
    ResolvingWeather,
    AllocatingScenario,
    PreparingInputs,
    RunningEngine,
    CollectingResults,
    Completed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::ResolvingLocation => "resolving location",
            RunStage::ResolvingWeather => "resolving weather",
            RunStage::AllocatingScenario => "allocating scenario",
            RunStage::PreparingInputs => "preparing inputs",
            RunStage::RunningEngine => "running engine",
            RunStage::CollectingResults => "collecting results",
            RunStage::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepProgress {
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub sweep: Option<SweepProgress>,
}

/// Callback invoked from worker threads during sweeps.
pub type ProgressCallback<'a> = &'a (dyn Fn(ProgressEvent) + Sync);

pub(crate) fn emit(
    progress_cb: Option<ProgressCallback<'_>>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    sweep: Option<SweepProgress>,
) {
    if let Some(cb) = progress_cb {
        cb(ProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            sweep,
        });
    }
}
