//! Tree walk deciding which files get change notifications.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use relaunch_core::Settings;

use crate::error::{walk_err, WatchError};
use crate::watcher::ChangeWatcher;

/// Files subscribed for notifications. Computed once at startup; files created
/// later are not picked up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    files: BTreeSet<PathBuf>,
}

impl WatchSet {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }
}

impl FromIterator<PathBuf> for WatchSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// Walk `settings.working_dir()` and collect every regular file whose
/// extension is watched, skipping ignored directories entirely.
///
/// Only a failure to read the root itself is an error; unreadable entries
/// further down are skipped.
pub fn collect_watch_set(settings: &Settings) -> Result<WatchSet, WatchError> {
    let root = settings.working_dir();
    let root_entries = fs::read_dir(root).map_err(|e| walk_err(root, e))?;

    let mut files = BTreeSet::new();
    let mut pending = vec![root_entries];

    while let Some(entries) = pending.pop() {
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let Ok(ty) = entry.file_type() else { continue };
            // Lossy so non-UTF-8 names are still walked.
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();

            if ty.is_dir() {
                if settings.ignores_dir(&name) {
                    tracing::debug!(path = %entry.path().display(), "skipping ignored directory");
                    continue;
                }
                match fs::read_dir(entry.path()) {
                    Ok(children) => pending.push(children),
                    Err(err) => {
                        tracing::debug!(path = %entry.path().display(), error = %err, "skipping unreadable directory");
                    }
                }
            } else if ty.is_file()
                && dotted_extension(&name).is_some_and(|ext| settings.watches_extension(ext))
            {
                files.insert(entry.path());
            }
        }
    }

    Ok(WatchSet { files })
}

/// Subscribe each file of `set` with `watcher`. Files the platform refuses are
/// logged and left out of the returned set.
pub fn register(watcher: &mut ChangeWatcher, set: &WatchSet) -> WatchSet {
    set.iter()
        .filter_map(|path| match watcher.watch_file(path) {
            Ok(()) => Some(path.to_path_buf()),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "could not watch file");
                None
            }
        })
        .collect()
}

/// Suffix from the last dot of a file name, dot included (`"a.b.go"` → `".go"`).
fn dotted_extension(file_name: &str) -> Option<&str> {
    file_name.rfind('.').map(|idx| &file_name[idx..])
}
