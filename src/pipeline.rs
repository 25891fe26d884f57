//! Orchestration of a sample run
//!
//! Stages run one after the other in a fixed order. Before each stage the orchestrator checks
//! whether its artifact already exists and skips it if so, which makes a rerun after a crash (or
//! of a finished sample) cheap. The first failure ends the run in the `Failed` state, leaving
//! whatever the failing tool wrote on disk.

use std::fs;
use std::io;
use std::path::Path;

use log::{debug, info, warn};

use crate::backend::ExecutionBackend;
use crate::command::exec::{execute, Runner};
use crate::context::RunContext;
use crate::error::PipelineError;
use crate::stage::{sample_stages, Stage, StageKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Running(StageKind),
    Done,
    Failed(StageKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// Artifact already present
    Skipped,
    Completed,
    /// Dry run: the stage would have been run
    Planned,
}

/// What happened to each stage of a run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub stages: Vec<(StageKind, StageStatus)>,
    /// External invocations actually executed
    pub invocations: usize,
}

impl RunReport {
    pub fn status(&self, kind: StageKind) -> Option<StageStatus> {
        self.stages.iter().find(|(k, _)| *k == kind).map(|(_, status)| *status)
    }
}

pub struct Orchestrator<'a, R: Runner> {
    ctx: &'a RunContext,
    backend: &'a dyn ExecutionBackend,
    runner: R,
    state: RunState,
}

impl<'a, R: Runner> Orchestrator<'a, R> {
    pub fn new(ctx: &'a RunContext, backend: &'a dyn ExecutionBackend, runner: R) -> Self {
        Orchestrator { ctx, backend, runner, state: RunState::Init }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn into_runner(self) -> R {
        self.runner
    }

    /// Walk every stage, ending in `Done` or `Failed`
    pub fn run(&mut self) -> Result<RunReport, PipelineError> {
        let stages = sample_stages(self.ctx);
        let mut report = RunReport::default();

        for (i, stage) in stages.iter().enumerate() {
            self.state = RunState::Running(stage.kind);
            match self.run_stage(stage, &stages[i + 1..], &mut report) {
                Ok(status) => report.stages.push((stage.kind, status)),
                Err(err) => {
                    self.state = RunState::Failed(stage.kind);
                    self.ctx.log().error(&format!("Run stopped at {}: {}", stage.kind, err));
                    return Err(err);
                }
            }
        }

        self.state = RunState::Done;
        info!("Sample {} done, {} invocation(s)", self.ctx.sample, report.invocations);
        Ok(report)
    }

    /// A stage is done if its artifact or the artifact of any later stage exists; later
    /// artifacts are only made from this stage's output, which may since have been cleaned up.
    fn satisfied(&self, stage: &Stage, later: &[Stage]) -> bool {
        if self.ctx.force {
            return false;
        }
        stage.artifact.exists() || later.iter().any(|s| s.artifact.exists())
    }

    fn run_stage(
        &mut self,
        stage: &Stage,
        later: &[Stage],
        report: &mut RunReport,
    ) -> Result<StageStatus, PipelineError> {
        if self.satisfied(stage, later) {
            debug!("{}: {} exists, skipping", stage.kind, stage.artifact.display());
            return Ok(StageStatus::Skipped);
        }

        // a dry run never creates the inputs of later stages
        if !self.ctx.dry_run {
            if let Some(path) = stage.predecessors.iter().find(|p| !p.exists()) {
                return Err(PipelineError::MissingPredecessor { stage: stage.kind, path: path.clone() });
            }
        }
        if let Some(marker) = &stage.requires_index {
            if !marker.exists() {
                return Err(PipelineError::IndexMissing { path: marker.clone() });
            }
        }

        let log = self.ctx.log();
        log.info(stage.kind.banner());
        let invocation = stage.invocation(self.backend, &self.ctx.out_dir);

        if self.ctx.dry_run {
            log.info(&format!("dry run: {}", invocation));
            return Ok(StageStatus::Planned);
        }

        report.invocations += 1;
        let output = execute(&mut self.runner, stage.kind, &invocation, log)?;
        if stage.log_output {
            log.info_lines(&output);
        }
        if !stage.artifact.exists() {
            return Err(PipelineError::MissingArtifact { stage: stage.kind, path: stage.artifact.clone() });
        }

        if !self.ctx.keep_tmp {
            for path in &stage.consumes {
                remove_intermediate(path);
            }
        }
        Ok(StageStatus::Completed)
    }
}

fn remove_intermediate(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!("Can't remove intermediate {}: {}", path.display(), err),
    }
}
