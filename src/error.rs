use std::path::PathBuf;

/// Conditions that abort the restart loop.
#[derive(Debug, thiserror::Error)]
pub enum FraggleError {
    #[error("{0} not found. Are we in the right place?")]
    ExecutableNotFound(PathBuf),

    #[error("profile '{name}' is not in the profile table (known: {known}); fraggle does not know how to execute the job")]
    UnknownProfile { name: String, known: String },

    #[error("parameter file {0} cannot be found")]
    ParameterFileNotFound(PathBuf),

    #[error("cannot find anything to start from in {0}")]
    NothingToStartFrom(PathBuf),

    #[error("run has stalled: {0}")]
    Stalled(String),

    #[error("failed to parse profile file {path}: {source}")]
    ProfileFile {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl FraggleError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FraggleError::Io {
            path: path.into(),
            source,
        }
    }
}
