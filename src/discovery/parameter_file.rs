use std::path::{Path, PathBuf};

use crate::error::FraggleError;

const PARAMETER_SUFFIX: &str = ".enzo";

/// Outcome of a parameter file search. Paths are relative to the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Located {
    pub chosen: Option<PathBuf>,
    /// Every match, sorted. More than one entry means the choice was ambiguous.
    pub candidates: Vec<PathBuf>,
}

/// Find the `*.enzo` parameter file in `workdir`.
pub(crate) fn locate_parameter_file(workdir: &Path) -> Result<Located, FraggleError> {
    let entries = std::fs::read_dir(workdir).map_err(|e| FraggleError::io(workdir, e))?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.') && name.ends_with(PARAMETER_SUFFIX))
        .map(PathBuf::from)
        .collect();
    candidates.sort();

    let located = Located {
        chosen: candidates.first().cloned(),
        candidates,
    };
    match &located.chosen {
        None => tracing::warn!(dir = %workdir.display(), "no parameter file found"),
        Some(chosen) => match ambiguity_warning(&located.candidates) {
            Some(warning) => tracing::warn!("{warning}"),
            None => tracing::info!("found parameter file {}", chosen.display()),
        },
    }

    Ok(located)
}

/// Names every candidate and the one picked, when there was a choice to make.
fn ambiguity_warning(candidates: &[PathBuf]) -> Option<String> {
    let [chosen, _, ..] = candidates else {
        return None;
    };
    let names: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
    Some(format!(
        "more than one parameter file found: [{}]; using {}",
        names.join(", "),
        chosen.display()
    ))
}
