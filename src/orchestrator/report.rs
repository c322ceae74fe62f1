//! End-of-run reporting: a text summary for the log and an optional JSON export.

use anyhow::{Context, Result};
use std::path::Path;

use crate::model::{LaunchMode, RunReport};

/// One line per launch, then the stop reason.
pub(crate) fn build_text_summary(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.launches.len() + 1);
    for launch in &report.launches {
        let mode = match launch.mode {
            LaunchMode::FreshStart => "fresh start",
            LaunchMode::Restart => "restart",
        };
        let status = if launch.outcome.timed_out {
            "timed out".to_string()
        } else if launch.outcome.interrupted {
            "interrupted".to_string()
        } else {
            match launch.outcome.exit_code {
                Some(code) => format!("exit {code}"),
                None => "killed by signal".to_string(),
            }
        };
        lines.push(format!(
            "#{} {mode} from {} ({status}, {})",
            launch.iteration,
            launch.source.display(),
            humantime::format_duration(std::time::Duration::from_secs(launch.elapsed.as_secs()))
        ));
    }
    let mut last = format!(
        "{} launch(es) on {}, stopped: {}",
        report.launches.len(),
        report.profile,
        report.stop_reason.describe()
    );
    if let Some(error) = &report.error {
        last.push_str(&format!(" ({error})"));
    }
    lines.push(last);
    lines
}

pub(crate) fn export_json(path: &Path, report: &RunReport) -> Result<()> {
    let body = serde_json::to_string_pretty(report).context("serialize run report")?;
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
