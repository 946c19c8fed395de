//! On-disk configuration file.
//!
//! # Storage layout
//!
//! ```text
//! <working dir>/
//!   relaunch.json     (optional; absence means "use defaults")
//! ```
//!
//! ```json
//! {
//!   "mainFile": "main.go",
//!   "watchExtensions": [".go", ".tmpl"],
//!   "ignoreDirs": ["vendor", "node_modules"],
//!   "runner": ["go", "run"],
//!   "debounceMs": 200
//! }
//! ```
//!
//! Every key is optional and unknown keys are ignored. Validation happens later
//! in [`Settings::resolve`](crate::Settings::resolve); this module only reads
//! and parses.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Fixed file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "relaunch.json";

/// Raw contents of `relaunch.json`, before defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigFile {
    /// Entry-file override. Wins over the positional argument.
    pub main_file: Option<PathBuf>,
    pub watch_extensions: Vec<String>,
    pub ignore_dirs: Vec<String>,
    pub runner: Option<Vec<String>>,
    pub debounce_ms: Option<u64>,
}

/// `<dir>/relaunch.json`; pure, no I/O.
pub fn config_path_at(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Load `<dir>/relaunch.json`.
///
/// Returns `Ok(None)` when the file does not exist, [`ConfigError::Read`] when
/// it exists but cannot be read and [`ConfigError::Parse`] (with the path) when
/// it is not valid JSON.
pub fn load_config_at(dir: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    let path = config_path_at(dir);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().expect("tempdir");
        assert!(load_config_at(dir.path()).expect("load").is_none());
    }

    #[test]
    fn camel_case_keys_are_read() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            config_path_at(dir.path()),
            r#"{"mainFile":"cmd/app.go","watchExtensions":[".go"],"ignoreDirs":["vendor"],"debounceMs":0}"#,
        )
        .expect("write");

        let config = load_config_at(dir.path()).expect("load").expect("present");
        assert_eq!(config.main_file, Some(PathBuf::from("cmd/app.go")));
        assert_eq!(config.watch_extensions, vec![".go".to_string()]);
        assert_eq!(config.ignore_dirs, vec!["vendor".to_string()]);
        assert_eq!(config.runner, None);
        assert_eq!(config.debounce_ms, Some(0));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(config_path_at(dir.path()), r#"{"ignoreHiddenFiles":true}"#)
            .expect("write");

        let config = load_config_at(dir.path()).expect("load").expect("present");
        assert_eq!(config, ConfigFile::default());
    }
}
