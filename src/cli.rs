use crate::error::FraggleError;
use crate::launch::{DryRunLauncher, Interrupt, ProcessLauncher};
use crate::model::{CadenceLimits, RepeatPolicy, RunConfig};
use crate::orchestrator::{self, RunFailure};
use crate::profile::{self, ProfileTable};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "fraggle",
    version,
    about = "Relaunch a simulation from its latest checkpoint within one batch job"
)]
pub struct Cli {
    /// Execution profile naming the launcher for this system
    #[arg(default_value = "Stampede2")]
    pub profile: String,

    /// Simulation executable, relative to the working directory
    #[arg(default_value = "./enzo.exe")]
    pub executable: PathBuf,

    /// Directory holding the parameter file and data dumps
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    /// Total number of launches before giving up
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_launches: u32,

    /// Consecutive launches from the same source before --on-repeat applies
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_same_restarts: u32,

    /// What to do when the same source keeps being relaunched
    #[arg(long, value_enum, default_value_t = RepeatPolicy::Warn)]
    pub on_repeat: RepeatPolicy,

    /// Factor applied to dtDataDump by the stretch-cadence policy
    #[arg(long, default_value_t = 0.5)]
    pub cadence_stretch: f64,

    /// Smallest dtDataDump before the run counts as stalled
    #[arg(long, default_value_t = 0.1)]
    pub min_cadence: f64,

    /// Largest dtDataDump the stretch-cadence policy will write
    #[arg(long, default_value_t = 5.0)]
    pub max_cadence: f64,

    /// File name for the rewritten parameter file, written beside the dump it copies
    #[arg(long, default_value = "tmp.par")]
    pub scratch_file: PathBuf,

    /// Use --ignore-interpolated false to allow restarts from interpolated outputs
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub ignore_interpolated: bool,

    /// Pass -d to the executable (use --debug-flag false to drop it)
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub debug_flag: bool,

    /// Kill a launch that runs longer than this (e.g. 47h30m)
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// TOML file with extra execution profiles
    #[arg(long)]
    pub profiles: Option<PathBuf>,

    /// Write the run report as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Print the commands without executing anything
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    execute(args, Interrupt::install()).await
}

async fn execute(args: Cli, interrupt: Interrupt) -> Result<()> {
    let profiles = profile::load_profiles(args.profiles.as_deref())?;
    let cfg = build_config(&args, &profiles)?;

    let outcome = if cfg.dry_run {
        orchestrator::run_loop(&cfg, &DryRunLauncher, &interrupt).await
    } else {
        let launcher = ProcessLauncher::new(interrupt.clone());
        orchestrator::run_loop(&cfg, &launcher, &interrupt).await
    };
    let (report, failure) = match outcome {
        Ok(report) => (report, None),
        Err(RunFailure { report, error }) => (report, Some(error)),
    };

    for line in orchestrator::build_text_summary(&report) {
        tracing::info!("{line}");
    }
    if let Some(path) = args.export_json.as_deref() {
        orchestrator::export_json(path, &report)
            .with_context(|| format!("failed to export run report to {}", path.display()))?;
        tracing::info!("exported report: {}", path.display());
    }

    match failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Validate the environment and build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli, profiles: &ProfileTable) -> Result<RunConfig> {
    let workdir = args.workdir.clone();
    if !workdir.is_dir() {
        anyhow::bail!("working directory {} does not exist", workdir.display());
    }
    if !workdir.join(&args.executable).is_file() {
        return Err(FraggleError::ExecutableNotFound(args.executable.clone()).into());
    }
    let launcher = profiles.resolve(&args.profile)?.launcher.clone();

    Ok(RunConfig {
        workdir,
        executable: args.executable.clone(),
        profile: args.profile.clone(),
        launcher,
        max_launches: args.max_launches,
        max_same_restarts: args.max_same_restarts,
        on_repeat: args.on_repeat,
        cadence: CadenceLimits {
            stretch: args.cadence_stretch,
            min: args.min_cadence,
            max: args.max_cadence,
        },
        scratch_file: args.scratch_file.clone(),
        ignore_interpolated: args.ignore_interpolated,
        debug_flag: args.debug_flag,
        timeout: args.timeout.map(Into::into),
        dry_run: args.dry_run,
    })
}
