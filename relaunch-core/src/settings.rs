//! Resolved, validated settings.
//!
//! [`Settings`] is built once at startup by merging defaults, the optional
//! `relaunch.json` and the positional entry-file argument. Nothing mutates it
//! afterwards; every field is reachable through accessors only.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{load_config_at, ConfigFile};
use crate::error::ConfigError;

/// Extension watched when the configuration does not name any.
pub const DEFAULT_EXTENSION: &str = ".go";

/// Version-control directory, always ignored.
pub const VCS_DIR: &str = ".git";

/// Runtime invocation used when the configuration has no `runner`.
pub const DEFAULT_RUNNER: &[&str] = &["go", "run"];

/// Quiet period the event dispatcher waits for before reloading.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A dot-prefixed file suffix such as `.go`. Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Extension(String);

impl Extension {
    /// Normalize user input: trim, add the leading dot if missing.
    ///
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        match trimmed {
            "" | "." => None,
            s if s.starts_with('.') => Some(Self(s.to_owned())),
            s => Some(Self(format!(".{s}"))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything the runtime needs to know, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    working_dir: PathBuf,
    entry_file: PathBuf,
    watch_extensions: Vec<Extension>,
    ignore_dirs: Vec<String>,
    runner: Vec<String>,
    debounce: Duration,
}

impl Settings {
    /// Resolve settings for the process's current directory.
    pub fn load(entry_arg: Option<PathBuf>) -> Result<Self, ConfigError> {
        let working_dir = std::env::current_dir().map_err(ConfigError::WorkingDir)?;
        Self::load_at(working_dir, entry_arg)
    }

    /// Resolve settings for an explicit working directory, reading
    /// `<working_dir>/relaunch.json` if present.
    pub fn load_at(working_dir: PathBuf, entry_arg: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = load_config_at(&working_dir)?;
        Self::resolve(working_dir, entry_arg, config)
    }

    /// Merge defaults, an optional parsed configuration and the positional
    /// argument, then validate the entry file.
    pub fn resolve(
        working_dir: PathBuf,
        entry_arg: Option<PathBuf>,
        config: Option<ConfigFile>,
    ) -> Result<Self, ConfigError> {
        let config = config.unwrap_or_default();

        let entry_file = config
            .main_file
            .filter(|p| !p.as_os_str().is_empty())
            .or(entry_arg.filter(|p| !p.as_os_str().is_empty()))
            .ok_or(ConfigError::NoEntryFile)?;

        let on_disk = working_dir.join(&entry_file);
        match std::fs::metadata(&on_disk) {
            Ok(meta) if meta.is_dir() => {
                return Err(ConfigError::EntryFileIsDir { path: on_disk });
            }
            Ok(_) => {}
            Err(_) => return Err(ConfigError::EntryFileNotFound { path: on_disk }),
        }

        let mut watch_extensions: Vec<Extension> = Vec::new();
        for ext in config.watch_extensions.iter().filter_map(|e| Extension::parse(e)) {
            if !watch_extensions.contains(&ext) {
                watch_extensions.push(ext);
            }
        }
        if watch_extensions.is_empty() {
            watch_extensions.push(Extension(DEFAULT_EXTENSION.to_owned()));
        }

        let mut ignore_dirs = vec![VCS_DIR.to_owned()];
        for name in config.ignore_dirs.iter().map(|n| n.trim()) {
            if !name.is_empty() && !ignore_dirs.iter().any(|d| d == name) {
                ignore_dirs.push(name.to_owned());
            }
        }

        let runner = match config.runner {
            Some(runner) if runner.first().map_or(true, |p| p.trim().is_empty()) => {
                return Err(ConfigError::EmptyRunner);
            }
            Some(runner) => runner,
            None => DEFAULT_RUNNER.iter().map(|s| (*s).to_owned()).collect(),
        };

        let debounce = config
            .debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DEBOUNCE);

        Ok(Self {
            working_dir,
            entry_file,
            watch_extensions,
            ignore_dirs,
            runner,
            debounce,
        })
    }

    /// Root of the tree walk and working directory of the child.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Entry file as given by the user (possibly relative to [`working_dir`](Self::working_dir)).
    pub fn entry_file(&self) -> &Path {
        &self.entry_file
    }

    pub fn watch_extensions(&self) -> &[Extension] {
        &self.watch_extensions
    }

    /// Ignored directory names, `.git` first.
    pub fn ignore_dirs(&self) -> &[String] {
        &self.ignore_dirs
    }

    /// Program followed by its leading arguments; the entry file is appended
    /// at launch time.
    pub fn runner(&self) -> &[String] {
        &self.runner
    }

    /// Coalescing window. Zero means one reload per raw event.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// `true` if `ext` (dot included) is one of the watched extensions.
    pub fn watches_extension(&self, ext: &str) -> bool {
        self.watch_extensions.iter().any(|e| e.as_str() == ext)
    }

    /// `true` if a directory with this bare name must not be descended.
    pub fn ignores_dir(&self, name: &str) -> bool {
        self.ignore_dirs.iter().any(|d| d == name)
    }
}
