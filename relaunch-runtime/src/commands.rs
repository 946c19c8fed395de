//! Interactive commands read line by line from stdin.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;

use crate::error::{RuntimeError, WatchError};
use crate::status;
use crate::supervisor::SupervisorHandle;

/// One line of interactive input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `rs`
    Reload,
    /// `q`
    Quit,
    Unrecognized,
}

impl Command {
    /// Surrounding whitespace is ignored; anything else must match exactly.
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "rs" => Command::Reload,
            "q" => Command::Quit,
            _ => Command::Unrecognized,
        }
    }
}

/// How the listener finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// `q` was entered; the child has been terminated.
    Quit,
    /// Shutdown was signalled by someone else.
    Shutdown,
}

/// Serve commands from `input` until `q`, shutdown, or a read failure.
///
/// End of input stops reading but keeps the task parked on shutdown so the
/// watch loop carries on.
pub async fn listen_commands<R>(
    input: R,
    supervisor: SupervisorHandle,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<ListenerExit, RuntimeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => return Ok(ListenerExit::Shutdown),
            line = lines.next_line() => {
                let line = line.map_err(WatchError::Input)?;
                let Some(line) = line else {
                    tracing::debug!("stdin closed; interactive commands disabled");
                    let _ = shutdown_rx.recv().await;
                    return Ok(ListenerExit::Shutdown);
                };

                match Command::parse(&line) {
                    Command::Reload => {
                        status::restarting("restart requested");
                        match supervisor.reload().await? {
                            Some(child) => status::started(&child),
                            None => tracing::debug!("supervisor stopped; restart dropped"),
                        }
                    }
                    Command::Quit => {
                        status::quitting();
                        supervisor.terminate().await?;
                        return Ok(ListenerExit::Quit);
                    }
                    Command::Unrecognized => {
                        tracing::debug!(input = %line.trim(), "ignoring unrecognized command");
                    }
                }
            }
        }
    }
}
