//! OS file-change notification split into an event stream and an error stream.

use std::path::{Path, PathBuf};

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::WatchError;

/// "Something changed" on a watched path. The operation kind is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub paths: Vec<PathBuf>,
}

/// Receiving side of a [`ChangeWatcher`].
///
/// Both streams close once the watcher that feeds them is dropped.
#[derive(Debug)]
pub struct ChangeStreams {
    pub events: mpsc::UnboundedReceiver<ChangeEvent>,
    pub errors: mpsc::UnboundedReceiver<notify::Error>,
}

/// Wraps the platform watcher. Paths are registered one file at a time.
pub struct ChangeWatcher {
    inner: RecommendedWatcher,
    streams: ChangeStreams,
}

impl ChangeWatcher {
    pub fn new() -> Result<Self, WatchError> {
        let (event_tx, events) = mpsc::unbounded_channel::<ChangeEvent>();
        let (error_tx, errors) = mpsc::unbounded_channel::<notify::Error>();

        let inner = recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_change_kind(&event.kind) {
                    let _ = event_tx.send(ChangeEvent { paths: event.paths });
                }
            }
            Err(err) => {
                let _ = error_tx.send(err);
            }
        })
        .map_err(WatchError::Init)?;

        Ok(Self {
            inner,
            streams: ChangeStreams { events, errors },
        })
    }

    /// Subscribe to notifications for a single file.
    pub fn watch_file(&mut self, path: &Path) -> Result<(), notify::Error> {
        self.inner.watch(path, RecursiveMode::NonRecursive)
    }

    /// Hand out the streams. Keep the returned [`WatcherGuard`] alive for as
    /// long as events are wanted; dropping it closes both streams.
    pub fn into_streams(self) -> (WatcherGuard, ChangeStreams) {
        (WatcherGuard { _inner: self.inner }, self.streams)
    }
}

/// Keeps the platform watcher alive.
pub struct WatcherGuard {
    _inner: RecommendedWatcher,
}

/// Access events (open, read, close-without-write) are not changes.
fn is_change_kind(kind: &EventKind) -> bool {
    !matches!(kind, EventKind::Access(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind, RenameMode};
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn every_non_access_kind_counts_as_change() {
        assert!(is_change_kind(&EventKind::Create(CreateKind::File)));
        assert!(is_change_kind(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_change_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))));
        assert!(is_change_kind(&EventKind::Remove(RemoveKind::File)));
        assert!(is_change_kind(&EventKind::Any));
        assert!(!is_change_kind(&EventKind::Access(AccessKind::Any)));
    }

    #[tokio::test]
    async fn dropping_guard_closes_both_streams() {
        let watcher = ChangeWatcher::new().expect("watcher");
        let (guard, mut streams) = watcher.into_streams();
        drop(guard);

        assert!(streams.events.recv().await.is_none());
        assert!(streams.errors.recv().await.is_none());
    }

    #[tokio::test]
    async fn write_to_watched_file_produces_event() {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("main.go");
        std::fs::write(&file, "package main\n").expect("write");

        let mut watcher = ChangeWatcher::new().expect("watcher");
        watcher.watch_file(&file).expect("watch file");
        let (_guard, mut streams) = watcher.into_streams();

        std::fs::write(&file, "package main\n\nfunc main() {}\n").expect("rewrite");

        let event = tokio::time::timeout(Duration::from_secs(5), streams.events.recv())
            .await
            .expect("event before timeout")
            .expect("stream open");
        assert!(!event.paths.is_empty());
    }
}
