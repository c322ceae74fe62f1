//! Checkpoint enumeration.
//!
//! Enzo writes each dump to `<DumpDir>NNNN/<DumpName>NNNN`, where the file is the
//! dump's own parameter file. Two families exist, periodic data dumps and redshift
//! dumps; both are scanned and merged, then ordered by their `InitialTime`.

use std::path::{Path, PathBuf};

use crate::error::FraggleError;
use crate::model::{Checkpoint, CheckpointFamily, CheckpointSet};
use crate::params::{self, ParameterMap, INTERPOLATED_MARKER};

const SUFFIX_DIGITS: usize = 4;

/// Directory and file prefixes for both checkpoint families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NamingScheme {
    pub data_dir: String,
    pub data_name: String,
    pub redshift_dir: String,
    pub redshift_name: String,
}

impl Default for NamingScheme {
    fn default() -> Self {
        Self {
            data_dir: "DD".into(),
            data_name: "DD".into(),
            redshift_dir: "RD".into(),
            redshift_name: "RD".into(),
        }
    }
}

impl NamingScheme {
    pub fn from_parameters(map: &ParameterMap) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: map.get_or("DataDumpDir", &defaults.data_dir).to_string(),
            data_name: map.get_or("DataDumpName", &defaults.data_name).to_string(),
            redshift_dir: map
                .get_or("RedshiftDumpDir", &defaults.redshift_dir)
                .to_string(),
            redshift_name: map
                .get_or("RedshiftDumpName", &defaults.redshift_name)
                .to_string(),
        }
    }

    fn families(&self) -> [(CheckpointFamily, &str, &str); 2] {
        [
            (CheckpointFamily::Data, self.data_dir.as_str(), self.data_name.as_str()),
            (
                CheckpointFamily::Redshift,
                self.redshift_dir.as_str(),
                self.redshift_name.as_str(),
            ),
        ]
    }
}

/// Human-readable glob for one family, used in diagnostics.
fn family_pattern(dir_prefix: &str, name_prefix: &str) -> String {
    format!("{dir_prefix}????/{name_prefix}????")
}

/// Scan `workdir` for checkpoints.
///
/// Returns `Ok(None)` when neither family has a single match, which is the normal
/// state of a simulation that has never run. A `parameter_file` that does not
/// exist is fatal; it is never silently replaced by the default naming.
pub(crate) fn enumerate_checkpoints(
    workdir: &Path,
    parameter_file: Option<&Path>,
    ignore_interpolated: bool,
) -> Result<Option<CheckpointSet>, FraggleError> {
    let naming = match parameter_file {
        Some(rel) => {
            let path = workdir.join(rel);
            if !path.is_file() {
                return Err(FraggleError::ParameterFileNotFound(rel.to_path_buf()));
            }
            let map = ParameterMap::read(&path)
                .map_err(|_| FraggleError::ParameterFileNotFound(rel.to_path_buf()))?;
            NamingScheme::from_parameters(&map)
        }
        None => NamingScheme::default(),
    };

    let mut paths: Vec<(CheckpointFamily, PathBuf)> = Vec::new();
    for (family, dir_prefix, name_prefix) in naming.families() {
        let mut found = match_family(workdir, dir_prefix, name_prefix);
        found.sort();
        paths.extend(found.into_iter().map(|p| (family, p)));
    }

    if paths.is_empty() {
        let [(_, dd, dn), (_, rd, rn)] = naming.families();
        tracing::info!(
            "no files found matching the pattern {} or {}",
            family_pattern(dd, dn),
            family_pattern(rd, rn)
        );
        return Ok(None);
    }

    let mut scanned: Vec<Checkpoint> = paths
        .into_iter()
        .filter_map(|(family, rel)| match scan_checkpoint(workdir, &rel, family) {
            Ok(cp) => {
                tracing::debug!(
                    path = %cp.path.display(),
                    time = cp.time,
                    interpolated = cp.interpolated,
                    "scanned checkpoint"
                );
                Some(cp)
            }
            Err(reason) => {
                tracing::warn!(path = %rel.display(), "skipping checkpoint: {reason}");
                None
            }
        })
        .collect();

    // Stable: equal times keep discovery order.
    scanned.sort_by(|a, b| b.time.total_cmp(&a.time));

    let candidates = if ignore_interpolated {
        for cp in scanned.iter().filter(|cp| cp.interpolated) {
            tracing::debug!(path = %cp.path.display(), "ignoring interpolated output");
        }
        scanned.iter().filter(|cp| !cp.interpolated).cloned().collect()
    } else {
        scanned.clone()
    };

    Ok(Some(CheckpointSet {
        scanned,
        candidates,
    }))
}

/// Relative paths matching `<dir_prefix>NNNN/<name_prefix>NNNN`.
fn match_family(workdir: &Path, dir_prefix: &str, name_prefix: &str) -> Vec<PathBuf> {
    let (parent, dir_stem) = split_prefix(dir_prefix);
    let Ok(entries) = std::fs::read_dir(workdir.join(parent)) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        if !entry.path().is_dir() {
            continue;
        }
        let Ok(dir_name) = entry.file_name().into_string() else {
            continue;
        };
        if !has_numbered_suffix(&dir_name, dir_stem) {
            continue;
        }
        let Ok(files) = std::fs::read_dir(entry.path()) else {
            continue;
        };
        for file in files.filter_map(|e| e.ok()) {
            let Ok(file_name) = file.file_name().into_string() else {
                continue;
            };
            if has_numbered_suffix(&file_name, name_prefix) && file.path().is_file() {
                out.push(Path::new(parent).join(&dir_name).join(file_name));
            }
        }
    }
    out
}

/// Split `out/DD` into (`out/`, `DD`).
fn split_prefix(prefix: &str) -> (&str, &str) {
    match prefix.rfind('/') {
        Some(idx) => prefix.split_at(idx + 1),
        None => ("", prefix),
    }
}

fn has_numbered_suffix(name: &str, prefix: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => rest.len() == SUFFIX_DIGITS && rest.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Read the markers Enzo leaves in a dump's parameter file.
fn scan_checkpoint(
    workdir: &Path,
    rel: &Path,
    family: CheckpointFamily,
) -> Result<Checkpoint, String> {
    let text = params::read_lossy(&workdir.join(rel)).map_err(|e| e.to_string())?;

    let mut time = 0.0;
    let mut interpolated = false;
    for line in text.lines() {
        if line.contains(INTERPOLATED_MARKER) {
            interpolated = true;
        }
        if let Some(("InitialTime", value)) = params::parse_line(line) {
            time = value
                .parse::<f64>()
                .map_err(|_| format!("InitialTime value '{value}' is not a number"))?;
        }
    }

    Ok(Checkpoint {
        path: rel.to_path_buf(),
        family,
        time,
        interpolated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_dump(root: &Path, rel: &str, time: f64, interpolated: bool) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        let mut text = format!("InitialTime = {time}\nStopTime = 100\n");
        if interpolated {
            text.push_str("# WARNING! Interpolated output\n");
        }
        std::fs::write(path, text).expect("write dump");
    }

    fn paths(cps: &[Checkpoint]) -> Vec<PathBuf> {
        cps.iter().map(|c| c.path.clone()).collect()
    }

    #[test]
    fn no_dumps_is_an_empty_result() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir(dir.path().join("DD12")).expect("mkdir");

        let set = enumerate_checkpoints(dir.path(), None, true).expect("enumerate");
        assert!(set.is_none());
    }

    #[test]
    fn missing_parameter_file_is_fatal() {
        let dir = TempDir::new().expect("tempdir");
        write_dump(dir.path(), "DD0001/DD0001", 1.0, false);

        let err = enumerate_checkpoints(dir.path(), Some(Path::new("gone.enzo")), true)
            .expect_err("missing parameter file must fail");
        assert!(matches!(err, FraggleError::ParameterFileNotFound(p) if p == Path::new("gone.enzo")));
    }

    #[test]
    fn sorted_most_recent_first_across_families() {
        let dir = TempDir::new().expect("tempdir");
        write_dump(dir.path(), "DD0001/DD0001", 3.0, false);
        write_dump(dir.path(), "DD0002/DD0002", 9.0, false);
        write_dump(dir.path(), "RD0000/RD0000", 5.5, false);

        let set = enumerate_checkpoints(dir.path(), None, true)
            .expect("enumerate")
            .expect("some");
        assert_eq!(
            paths(&set.candidates),
            vec![
                PathBuf::from("DD0002/DD0002"),
                PathBuf::from("RD0000/RD0000"),
                PathBuf::from("DD0001/DD0001"),
            ]
        );
        assert_eq!(set.candidates[1].family, CheckpointFamily::Redshift);
        for pair in set.candidates.windows(2) {
            assert!(pair[0].time >= pair[1].time);
        }
    }

    #[test]
    fn equal_times_keep_discovery_order() {
        let dir = TempDir::new().expect("tempdir");
        write_dump(dir.path(), "DD0003/DD0003", 2.0, false);
        write_dump(dir.path(), "DD0001/DD0001", 2.0, false);
        write_dump(dir.path(), "RD0002/RD0002", 2.0, false);

        let set = enumerate_checkpoints(dir.path(), None, true)
            .expect("enumerate")
            .expect("some");
        assert_eq!(
            paths(&set.scanned),
            vec![
                PathBuf::from("DD0001/DD0001"),
                PathBuf::from("DD0003/DD0003"),
                PathBuf::from("RD0002/RD0002"),
            ]
        );
    }

    #[test]
    fn filtering_only_removes_interpolated_dumps() {
        let dir = TempDir::new().expect("tempdir");
        write_dump(dir.path(), "DD0005/DD0005", 12.0, false);
        write_dump(dir.path(), "DD0010/DD0010", 25.0, true);
        write_dump(dir.path(), "RD0001/RD0001", 30.0, true);

        let filtered = enumerate_checkpoints(dir.path(), None, true)
            .expect("enumerate")
            .expect("some");
        let unfiltered = enumerate_checkpoints(dir.path(), None, false)
            .expect("enumerate")
            .expect("some");

        assert!(filtered.candidates.len() <= unfiltered.candidates.len());
        assert_eq!(paths(&filtered.candidates), vec![PathBuf::from("DD0005/DD0005")]);
        assert_eq!(unfiltered.candidates.len(), 3);
        for removed in unfiltered
            .candidates
            .iter()
            .filter(|c| !filtered.candidates.contains(c))
        {
            assert!(removed.interpolated);
        }
        // The scan itself still reports the interpolated dumps.
        assert_eq!(filtered.scanned.len(), 3);
    }

    #[test]
    fn naming_overrides_come_from_parameter_file() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join("run.enzo"),
            "DataDumpDir = output/snap\nDataDumpName = data\nRedshiftDumpDir=RS\n",
        )
        .expect("write");
        write_dump(dir.path(), "output/snap0007/data0007", 4.0, false);
        write_dump(dir.path(), "RS0001/RD0001", 1.0, false);
        write_dump(dir.path(), "DD0009/DD0009", 50.0, false);

        let set = enumerate_checkpoints(dir.path(), Some(Path::new("run.enzo")), true)
            .expect("enumerate")
            .expect("some");
        assert_eq!(
            paths(&set.candidates),
            vec![
                PathBuf::from("output/snap0007/data0007"),
                PathBuf::from("RS0001/RD0001"),
            ]
        );
    }

    #[test]
    fn unreadable_or_malformed_dumps_are_skipped() {
        let dir = TempDir::new().expect("tempdir");
        write_dump(dir.path(), "DD0001/DD0001", 1.0, false);
        std::fs::create_dir_all(dir.path().join("DD0002")).expect("mkdir");
        std::fs::write(dir.path().join("DD0002/DD0002"), "InitialTime = soon\n").expect("write");

        let set = enumerate_checkpoints(dir.path(), None, true)
            .expect("enumerate")
            .expect("some");
        assert_eq!(paths(&set.scanned), vec![PathBuf::from("DD0001/DD0001")]);
    }

    #[test]
    fn suffix_must_be_four_digits() {
        assert!(has_numbered_suffix("DD0042", "DD"));
        assert!(!has_numbered_suffix("DD042", "DD"));
        assert!(!has_numbered_suffix("DD00420", "DD"));
        assert!(!has_numbered_suffix("DD00a2", "DD"));
        assert!(!has_numbered_suffix("RD0042", "DD"));
        assert_eq!(split_prefix("out/DD"), ("out/", "DD"));
        assert_eq!(split_prefix("DD"), ("", "DD"));
    }
}
