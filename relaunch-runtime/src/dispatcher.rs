//! Event listener task: turns file-change events into reloads.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{sleep_until, Instant};

use crate::error::{RuntimeError, WatchError};
use crate::status;
use crate::supervisor::SupervisorHandle;
use crate::watcher::{ChangeEvent, ChangeStreams};

/// Consume `streams` until shutdown.
///
/// With a zero `window` every event triggers its own reload. Otherwise events
/// are held until the stream has been quiet for `window`, then one reload
/// covers the whole burst.
///
/// Watcher errors are checked before events and are fatal, as is the error
/// stream closing on its own. Both streams closing (the watcher was dropped)
/// ends the task quietly.
pub async fn dispatch_events(
    mut streams: ChangeStreams,
    supervisor: SupervisorHandle,
    window: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), RuntimeError> {
    let mut pending: Option<(Instant, ChangeEvent, usize)> = None;

    loop {
        let deadline = pending.as_ref().map(|(at, _, _)| *at);

        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            err = streams.errors.recv() => match err {
                Some(err) => return Err(WatchError::Notify(err).into()),
                None if streams.events.is_closed() => {
                    tracing::debug!("change streams closed");
                    break;
                }
                None => return Err(WatchError::ErrorStreamClosed.into()),
            },
            event = streams.events.recv() => {
                let Some(event) = event else {
                    tracing::debug!("change stream closed");
                    break;
                };
                if window.is_zero() {
                    reload_for(&supervisor, &event, 1).await?;
                    continue;
                }
                let count = pending.take().map_or(0, |(_, _, n)| n) + 1;
                pending = Some((Instant::now() + window, event, count));
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some((_, event, count)) = pending.take() {
                    reload_for(&supervisor, &event, count).await?;
                }
            }
        }
    }

    Ok(())
}

async fn reload_for(
    supervisor: &SupervisorHandle,
    event: &ChangeEvent,
    burst: usize,
) -> Result<(), RuntimeError> {
    let path = event
        .paths
        .first()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "unknown path".to_string());
    tracing::debug!(%path, burst, "change detected");

    let reason = if burst > 1 {
        format!("{path} changed ({burst} events)")
    } else {
        format!("{path} changed")
    };
    status::restarting(&reason);
    match supervisor.reload().await? {
        Some(child) => status::started(&child),
        None => tracing::debug!("supervisor stopped; reload dropped"),
    }
    Ok(())
}
