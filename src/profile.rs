//! Execution profiles: how to put the simulation executable on the machine.
//!
//! A profile is the launcher prefix a given system needs in front of the
//! executable. A few are built in; more can be declared in a TOML file:
//!
//! ```toml
//! [profiles.Frontera]
//! launcher = ["ibrun"]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::FraggleError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub launcher: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    profiles: BTreeMap<String, Profile>,
}

#[derive(Debug, Clone)]
pub struct ProfileTable {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileTable {
    pub fn builtin() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "Stampede2".to_string(),
            Profile {
                launcher: vec!["ibrun".into(), "mem_affinity".into()],
            },
        );
        profiles.insert("local".to_string(), Profile { launcher: vec![] });
        Self { profiles }
    }

    /// Parse a profile file body. Entries replace built-ins of the same name.
    pub fn merge_toml(&mut self, path: &Path, text: &str) -> Result<(), FraggleError> {
        let file: ProfileFile = toml::from_str(text).map_err(|source| FraggleError::ProfileFile {
            path: path.to_path_buf(),
            source,
        })?;
        self.profiles.extend(file.profiles);
        Ok(())
    }

    pub fn merge_file(&mut self, path: &Path) -> Result<(), FraggleError> {
        let text = std::fs::read_to_string(path).map_err(|e| FraggleError::io(path, e))?;
        self.merge_toml(path, &text)
    }

    pub fn resolve(&self, name: &str) -> Result<&Profile, FraggleError> {
        self.profiles
            .get(name)
            .ok_or_else(|| FraggleError::UnknownProfile {
                name: name.to_string(),
                known: self.profiles.keys().cloned().collect::<Vec<_>>().join(", "),
            })
    }
}

/// `<config dir>/fraggle/profiles.toml`, if the platform has a config dir.
pub fn default_profile_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fraggle").join("profiles.toml"))
}

/// Build the profile table: built-ins, then `explicit` if given, otherwise the
/// default profile file when it exists.
pub fn load_profiles(explicit: Option<&Path>) -> Result<ProfileTable, FraggleError> {
    let mut table = ProfileTable::builtin();
    match explicit {
        Some(path) => table.merge_file(path)?,
        None => {
            if let Some(path) = default_profile_file().filter(|p| p.is_file()) {
                tracing::debug!(path = %path.display(), "loading profiles");
                table.merge_file(&path)?;
            }
        }
    }
    Ok(table)
}
