use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Everything the restart loop needs, built once from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub workdir: PathBuf,
    pub executable: PathBuf,
    pub profile: String,
    /// Words placed in front of the executable (e.g. `ibrun mem_affinity`).
    pub launcher: Vec<String>,
    pub max_launches: u32,
    pub max_same_restarts: u32,
    pub on_repeat: RepeatPolicy,
    pub cadence: CadenceLimits,
    /// Name of the rewritten parameter file, placed beside the file it copies.
    pub scratch_file: PathBuf,
    pub ignore_interpolated: bool,
    pub debug_flag: bool,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub dry_run: bool,
}

/// What to do once the same source has been launched more than
/// `max_same_restarts` times in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatPolicy {
    /// Log a warning and keep relaunching.
    Warn,
    /// Abort the loop as stalled.
    Stop,
    /// Shorten the output cadence in a scratch copy and relaunch from it.
    StretchCadence,
}

/// Bounds for the `dtDataDump` rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CadenceLimits {
    pub stretch: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for CadenceLimits {
    fn default() -> Self {
        Self {
            stretch: 0.5,
            min: 0.1,
            max: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointFamily {
    /// Periodic data dumps (`DD`).
    Data,
    /// Redshift-keyed dumps (`RD`).
    Redshift,
}

/// One checkpoint found on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub path: PathBuf,
    pub family: CheckpointFamily,
    pub time: f64,
    pub interpolated: bool,
}

/// Result of one checkpoint scan, most recent first.
#[derive(Debug, Clone, Default)]
pub struct CheckpointSet {
    /// Every checkpoint that could be read, interpolated or not.
    pub scanned: Vec<Checkpoint>,
    /// Restart candidates after optional interpolation filtering.
    pub candidates: Vec<Checkpoint>,
}

impl CheckpointSet {
    pub fn latest(&self) -> Option<&Checkpoint> {
        self.candidates.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchMode {
    FreshStart,
    Restart,
}

/// The command for one launch, before it is handed to a [`crate::launch::Launcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
}

impl LaunchCommand {
    pub fn render(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaunchOutcome {
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub interrupted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchRecord {
    pub iteration: u32,
    pub mode: LaunchMode,
    pub source: PathBuf,
    pub same_source_count: u32,
    pub command: String,
    pub started_utc: String,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub outcome: LaunchOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The configured number of launches was reached.
    LaunchLimit,
    /// A fresh start produced no checkpoint to continue from.
    NoProgress,
    /// The operator interrupted a running child.
    Interrupted,
    /// A fatal condition ended the loop; see [`RunReport::error`].
    Failed,
}

impl StopReason {
    pub fn describe(self) -> &'static str {
        match self {
            StopReason::LaunchLimit => "launch limit reached",
            StopReason::NoProgress => "fresh start left no checkpoint to restart from",
            StopReason::Interrupted => "interrupted",
            StopReason::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub profile: String,
    pub executable: PathBuf,
    pub launches: Vec<LaunchRecord>,
    pub stop_reason: StopReason,
    #[serde(default)]
    pub error: Option<String>,
}
