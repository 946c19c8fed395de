//! Watch loop runtime: tree registration, change watcher, child supervisor and
//! interactive commands.

pub mod commands;
pub mod dispatcher;
mod error;
pub mod registrar;
mod runtime;
pub mod status;
pub mod supervisor;
pub mod watcher;

pub use commands::{listen_commands, Command, ListenerExit};
pub use dispatcher::dispatch_events;
pub use error::{ErrorKind, ProcessError, RuntimeError, WatchError};
pub use registrar::{collect_watch_set, register, WatchSet};
pub use runtime::{run, start_blocking, Phase, SHUTDOWN_GRACE};
pub use supervisor::{ChildInfo, LaunchSpec, ProcessSupervisor, Snapshot, SupervisorHandle};
pub use watcher::{ChangeEvent, ChangeStreams, ChangeWatcher, WatcherGuard};
