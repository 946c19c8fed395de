//! Error types for relaunch-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while resolving [`Settings`](crate::Settings).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("error reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the expected shape.
    #[error("error parsing config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Neither the command line nor the configuration named an entry file.
    #[error("no entry file specified in config or command")]
    NoEntryFile,

    #[error("entry file not found: {path}")]
    EntryFileNotFound { path: PathBuf },

    #[error("entry file should not be a directory: {path}")]
    EntryFileIsDir { path: PathBuf },

    /// `runner` was present in the configuration but held no program.
    #[error("runner command cannot be empty")]
    EmptyRunner,

    #[error("cannot determine working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
}
