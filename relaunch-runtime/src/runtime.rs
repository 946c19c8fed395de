use std::fmt;
use std::time::Duration;

use relaunch_core::Settings;
use tokio::io::BufReader;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::commands::{listen_commands, ListenerExit};
use crate::dispatcher::dispatch_events;
use crate::error::{RuntimeError, WatchError};
use crate::registrar::{collect_watch_set, register};
use crate::status;
use crate::supervisor::{LaunchSpec, ProcessSupervisor};
use crate::watcher::ChangeWatcher;

/// Upper bound on joining the listener tasks after shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Upper bound on tearing down the tokio runtime (covers a pending stdin read).
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Orchestrator lifecycle, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Walking,
    Watching,
    Reloading,
    Quitting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Initializing => write!(f, "initializing"),
            Phase::Walking => write!(f, "walking"),
            Phase::Watching => write!(f, "watching"),
            Phase::Reloading => write!(f, "reloading"),
            Phase::Quitting => write!(f, "quitting"),
        }
    }
}

fn enter(phase: Phase) {
    tracing::debug!(%phase, "phase");
}

/// Install tracing, start a tokio runtime and block until the watch loop exits.
pub fn start_blocking(settings: Settings) -> Result<(), RuntimeError> {
    init_tracing();
    enter(Phase::Initializing);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(RuntimeError::Runtime)?;
    let result = runtime.block_on(run(settings));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

/// Walk, watch, supervise. Returns once `q`, Ctrl-C or a fatal error ends the
/// session; the child is terminated in every case.
pub async fn run(settings: Settings) -> Result<(), RuntimeError> {
    enter(Phase::Walking);
    let mut watcher = ChangeWatcher::new()?;
    let candidates = collect_watch_set(&settings)?;
    let watch_set = register(&mut watcher, &candidates);
    tracing::debug!(
        candidates = candidates.len(),
        registered = watch_set.len(),
        "watch set ready"
    );
    let (watcher_guard, streams) = watcher.into_streams();

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(16);
    let launch = LaunchSpec::from_settings(&settings);

    let (supervisor, supervisor_handle) =
        ProcessSupervisor::new(launch.clone()).spawn(shutdown_tx.subscribe());

    let dispatcher_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        let supervisor = supervisor.clone();
        let window = settings.debounce();
        tokio::spawn(async move {
            let result = dispatch_events(streams, supervisor, window, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let command_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            let input = BufReader::new(tokio::io::stdin());
            let result = listen_commands(input, supervisor, shutdown_rx).await;
            if let Ok(ListenerExit::Quit) = result {
                enter(Phase::Quitting);
            }
            let _ = shutdown.send(());
            result.map(|_| ())
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    let _ = shutdown.send(());
                    match signal {
                        Ok(()) => {
                            enter(Phase::Quitting);
                            status::quitting();
                            Ok(())
                        }
                        Err(err) => Err(RuntimeError::from(WatchError::Input(err))),
                    }
                }
            }
        })
    };

    status::banner(&settings, watch_set.len(), &launch);

    enter(Phase::Reloading);
    let startup = match supervisor.reload().await {
        Ok(Some(child)) => {
            status::started(&child);
            enter(Phase::Watching);
            let _ = shutdown_rx.recv().await;
            Ok(())
        }
        // Shutdown won the race with the first launch.
        Ok(None) => Ok(()),
        Err(err) => {
            let _ = shutdown_tx.send(());
            Err(err)
        }
    };
    drop(supervisor);

    let aborts = [
        dispatcher_handle.abort_handle(),
        command_handle.abort_handle(),
        signal_handle.abort_handle(),
        supervisor_handle.abort_handle(),
    ];
    let joined = tokio::time::timeout(SHUTDOWN_GRACE, async {
        tokio::join!(
            join_task("dispatcher", dispatcher_handle),
            join_task("commands", command_handle),
            join_task("signal", signal_handle),
            join_task("supervisor", supervisor_handle),
        )
    })
    .await;
    drop(watcher_guard);

    let results = match joined {
        Ok((dispatcher, commands, signal, supervisor)) => {
            vec![dispatcher, commands, signal, supervisor]
        }
        Err(_) => {
            tracing::warn!(grace = ?SHUTDOWN_GRACE, "tasks did not stop in time; aborting");
            for handle in aborts {
                handle.abort();
            }
            Vec::new()
        }
    };

    startup?;
    results.into_iter().collect::<Result<Vec<()>, _>>()?;
    Ok(())
}

async fn join_task(
    task: &'static str,
    handle: JoinHandle<Result<(), RuntimeError>>,
) -> Result<(), RuntimeError> {
    match handle.await {
        Ok(inner) => inner,
        Err(err) => Err(RuntimeError::TaskJoin {
            task,
            reason: err.to_string(),
        }),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
