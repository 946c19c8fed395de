use std::path::PathBuf;

use relaunch_core::ConfigError;
use thiserror::Error;

/// Error surface for the watch loop, supervisor and command listener.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("cannot start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("{task} task join failure: {reason}")]
    TaskJoin { task: &'static str, reason: String },
}

/// Failures setting up or running file-change notification and stdin input.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("error while setting up watcher: {0}")]
    Init(#[source] notify::Error),

    #[error("error while walking file system at {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error while reading commands from stdin: {0}")]
    Input(#[source] std::io::Error),

    #[error("file watcher error: {0}")]
    Notify(#[source] notify::Error),

    #[error("file watcher error stream closed")]
    ErrorStreamClosed,
}

/// Failures starting or stopping the supervised child.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("error while starting `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error while killing program (pid {pid}): {source}")]
    Kill {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification used for reporting and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    WatcherSetup,
    Process,
    Internal,
}

impl ErrorKind {
    /// sysexits-style exit status for this class of failure.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Config => 78,
            ErrorKind::WatcherSetup => 74,
            ErrorKind::Process => 71,
            ErrorKind::Internal => 70,
        }
    }
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::Config(_) => ErrorKind::Config,
            RuntimeError::Watch(_) => ErrorKind::WatcherSetup,
            RuntimeError::Process(_) => ErrorKind::Process,
            RuntimeError::Runtime(_)
            | RuntimeError::ChannelClosed(_)
            | RuntimeError::TaskJoin { .. } => ErrorKind::Internal,
        }
    }
}

pub(crate) fn walk_err(path: impl Into<PathBuf>, source: std::io::Error) -> WatchError {
    WatchError::Walk {
        path: path.into(),
        source,
    }
}
