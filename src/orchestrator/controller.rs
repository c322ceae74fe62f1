//! Restart loop controller.
//!
//! Each pass rediscovers the parameter file and checkpoints, picks what to launch
//! from, runs the simulation to completion and decides whether to go again.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::cadence::{link_companions, stretch_output_cadence};
use crate::discovery::{enumerate_checkpoints, locate_parameter_file};
use crate::error::FraggleError;
use crate::launch::{build_command, Interrupt, Launcher};
use crate::model::{
    CadenceLimits, Checkpoint, LaunchMode, LaunchRecord, RepeatPolicy, RunConfig, RunReport,
    StopReason,
};

/// What the next launch starts from.
#[derive(Debug, Clone)]
enum Plan {
    FreshStart { parameter_file: PathBuf },
    Restart { checkpoint: Checkpoint },
}

impl Plan {
    fn mode(&self) -> LaunchMode {
        match self {
            Plan::FreshStart { .. } => LaunchMode::FreshStart,
            Plan::Restart { .. } => LaunchMode::Restart,
        }
    }

    fn source(&self) -> &Path {
        match self {
            Plan::FreshStart { parameter_file } => parameter_file,
            Plan::Restart { checkpoint } => &checkpoint.path,
        }
    }
}

/// Loop bookkeeping for the lifetime of the process.
#[derive(Debug, Default)]
struct RunState {
    iteration: u32,
    previous_source: Option<PathBuf>,
    same_source_count: u32,
}

impl RunState {
    /// Track consecutive launches from `source`; returns the updated count.
    fn observe(&mut self, source: &Path) -> u32 {
        if self.previous_source.as_deref() == Some(source) {
            self.same_source_count += 1;
            tracing::warn!(
                "restarting from the same data dump again (try number {}): {}",
                self.same_source_count,
                source.display()
            );
        } else {
            self.same_source_count = 1;
            self.previous_source = Some(source.to_path_buf());
        }
        self.same_source_count
    }
}

/// Discover and decide. Fails when there is nothing at all to start from.
fn select_plan(cfg: &RunConfig) -> Result<Plan, FraggleError> {
    let located = locate_parameter_file(&cfg.workdir)?;
    let set = enumerate_checkpoints(
        &cfg.workdir,
        located.chosen.as_deref(),
        cfg.ignore_interpolated,
    )?;

    if let Some(checkpoint) = set.as_ref().and_then(|s| s.latest()) {
        return Ok(Plan::Restart {
            checkpoint: checkpoint.clone(),
        });
    }
    if let Some(set) = set.as_ref().filter(|s| !s.scanned.is_empty()) {
        tracing::warn!(
            "all {} checkpoints are interpolated outputs, none can be restarted from",
            set.scanned.len()
        );
    }

    match located.chosen {
        Some(parameter_file) => Ok(Plan::FreshStart { parameter_file }),
        None => Err(FraggleError::NothingToStartFrom(cfg.workdir.clone())),
    }
}

/// Apply the repeat policy; returns the path the executable should be given.
fn apply_repeat_policy(cfg: &RunConfig, plan: &Plan, same_count: u32) -> Result<PathBuf, FraggleError> {
    let source = plan.source();
    if same_count <= cfg.max_same_restarts {
        return Ok(source.to_path_buf());
    }

    let excess = same_count - cfg.max_same_restarts;
    match cfg.on_repeat {
        RepeatPolicy::Warn => {
            tracing::warn!(
                "{} launched {} times in a row (limit {}), continuing",
                source.display(),
                same_count,
                cfg.max_same_restarts
            );
            Ok(source.to_path_buf())
        }
        RepeatPolicy::Stop => Err(FraggleError::Stalled(format!(
            "{} launched {} times in a row (limit {})",
            source.display(),
            same_count,
            cfg.max_same_restarts
        ))),
        RepeatPolicy::StretchCadence => {
            // Each further repeat shrinks the cadence again.
            let limits = CadenceLimits {
                stretch: cfg.cadence.stretch.powi(excess as i32),
                ..cfg.cadence
            };
            let scratch = source.with_file_name(&cfg.scratch_file);
            let (src, dst) = (cfg.workdir.join(source), cfg.workdir.join(&scratch));
            stretch_output_cadence(&src, &dst, &limits)?;
            link_companions(&src, &dst)?;
            Ok(scratch)
        }
    }
}

/// A loop that ended on a fatal condition, with the launches made before it.
#[derive(Debug)]
pub(crate) struct RunFailure {
    pub report: RunReport,
    pub error: anyhow::Error,
}

/// Run the discover/launch cycle until a stop condition is reached.
///
/// The report is returned on failure too, so callers can still summarize and
/// export what happened before the loop gave up.
pub(crate) async fn run_loop<L: Launcher>(
    cfg: &RunConfig,
    launcher: &L,
    interrupt: &Interrupt,
) -> Result<RunReport, RunFailure> {
    tracing::info!(
        "attempting to run {} on system {}",
        cfg.executable.display(),
        cfg.profile
    );

    let mut launches: Vec<LaunchRecord> = Vec::new();
    let result = drive(cfg, launcher, interrupt, &mut launches).await;

    let report = |stop_reason, error| RunReport {
        profile: cfg.profile.clone(),
        executable: cfg.executable.clone(),
        launches,
        stop_reason,
        error,
    };
    match result {
        Ok(stop_reason) => Ok(report(stop_reason, None)),
        Err(error) => Err(RunFailure {
            report: report(StopReason::Failed, Some(format!("{error:#}"))),
            error,
        }),
    }
}

async fn drive<L: Launcher>(
    cfg: &RunConfig,
    launcher: &L,
    interrupt: &Interrupt,
    launches: &mut Vec<LaunchRecord>,
) -> Result<StopReason> {
    let mut state = RunState::default();
    let mut last_mode: Option<LaunchMode> = None;

    loop {
        if state.iteration >= cfg.max_launches {
            return Ok(StopReason::LaunchLimit);
        }
        if interrupt.is_set() {
            tracing::warn!("interrupted, not launching again");
            return Ok(StopReason::Interrupted);
        }

        let plan = select_plan(cfg)?;
        if plan.mode() == LaunchMode::FreshStart && last_mode == Some(LaunchMode::FreshStart) {
            tracing::warn!("previous fresh start wrote no checkpoint, not starting over again");
            return Ok(StopReason::NoProgress);
        }

        let same_count = state.observe(plan.source());
        match &plan {
            Plan::FreshStart { parameter_file } => {
                tracing::info!("no data dumps, starting from {}", parameter_file.display())
            }
            Plan::Restart { checkpoint } if same_count == 1 => tracing::info!(
                "restarting simulation from: {} (time {})",
                checkpoint.path.display(),
                checkpoint.time
            ),
            Plan::Restart { .. } => {}
        }

        let launch_source = apply_repeat_policy(cfg, &plan, same_count)?;
        let cmd = build_command(cfg, plan.mode(), &launch_source);
        tracing::info!("using command: {}", cmd.render());

        let started_utc = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into());
        let started = Instant::now();
        let outcome = launcher.launch(&cmd, cfg.timeout).await?;
        let elapsed = started.elapsed();

        tracing::info!(
            exit_code = ?outcome.exit_code,
            "simulation returned after {}",
            humantime::format_duration(std::time::Duration::from_secs(elapsed.as_secs()))
        );

        state.iteration += 1;
        last_mode = Some(plan.mode());
        launches.push(LaunchRecord {
            iteration: state.iteration,
            mode: plan.mode(),
            source: launch_source,
            same_source_count: same_count,
            command: cmd.render(),
            started_utc,
            elapsed,
            outcome,
        });

        if outcome.interrupted {
            return Ok(StopReason::Interrupted);
        }
    }
}
