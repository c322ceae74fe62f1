//! Output-cadence rewrite used when a run keeps restarting from the same dump.

use std::path::Path;

use crate::error::FraggleError;
use crate::model::CadenceLimits;
use crate::params::{self, ParameterMap};

const CADENCE_KEY: &str = "dtDataDump";

/// Copy `src` to `dst` with `dtDataDump` scaled by `limits.stretch`.
///
/// The new value is capped at `limits.max`. Falling below `limits.min` means the
/// run is no longer making progress and is reported as [`FraggleError::Stalled`];
/// `dst` is not written in that case. Returns the new cadence, or `None` when the
/// key is absent and the file was copied unchanged.
pub(crate) fn stretch_output_cadence(
    src: &Path,
    dst: &Path,
    limits: &CadenceLimits,
) -> Result<Option<f64>, FraggleError> {
    let text = params::read_lossy(src)?;
    let map = ParameterMap::parse(&text);

    let current = match map.get(CADENCE_KEY) {
        Some(raw) => raw.parse::<f64>().ok(),
        None => None,
    };

    let Some(current) = current else {
        tracing::warn!(
            path = %src.display(),
            "no usable {CADENCE_KEY} to stretch, copying parameters unchanged"
        );
        std::fs::write(dst, &text).map_err(|e| FraggleError::io(dst, e))?;
        return Ok(None);
    };

    let stretched = (current * limits.stretch).min(limits.max);
    if stretched < limits.min {
        return Err(FraggleError::Stalled(format!(
            "{CADENCE_KEY} would drop to {stretched} (floor {})",
            limits.min
        )));
    }

    let rewritten = params::replace_value(&text, CADENCE_KEY, &stretched.to_string());
    std::fs::write(dst, rewritten).map_err(|e| FraggleError::io(dst, e))?;
    tracing::info!(
        "{CADENCE_KEY} {current} -> {stretched}, written to {}",
        dst.display()
    );
    Ok(Some(stretched))
}

/// Hard-link `<src>.*` companions (hierarchy, boundary, ...) as `<dst>.*`.
///
/// Enzo finds a restart's companion files by the parameter file's name, so a
/// scratch copy beside the dump needs the same set under its own name. Returns
/// the number of links made.
pub(crate) fn link_companions(src: &Path, dst: &Path) -> Result<usize, FraggleError> {
    let (Some(dir), Some(src_name), Some(dst_name)) = (
        src.parent(),
        src.file_name().and_then(|n| n.to_str()),
        dst.file_name().and_then(|n| n.to_str()),
    ) else {
        return Ok(0);
    };
    let src_prefix = format!("{src_name}.");
    let entries = std::fs::read_dir(dir).map_err(|e| FraggleError::io(dir, e))?;

    let mut linked = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let Some(suffix) = name.strip_prefix(&src_prefix) else {
            continue;
        };
        if name == dst_name || name.starts_with(&format!("{dst_name}.")) {
            continue;
        }
        let target = dir.join(format!("{dst_name}.{suffix}"));
        if target.exists() {
            std::fs::remove_file(&target).map_err(|e| FraggleError::io(&target, e))?;
        }
        std::fs::hard_link(entry.path(), &target).map_err(|e| FraggleError::io(&target, e))?;
        linked += 1;
    }
    tracing::debug!(count = linked, "linked companion files for {}", dst.display());
    Ok(linked)
}
