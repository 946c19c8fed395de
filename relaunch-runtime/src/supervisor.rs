//! Single owner of the supervised child process.
//!
//! The child handle lives inside one task. Everyone else talks to it through a
//! [`SupervisorHandle`], whose requests are served strictly one at a time, so
//! two reloads can never interleave and leave two children running.

use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use relaunch_core::Settings;
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{ProcessError, RuntimeError};

const REQUEST_CAPACITY: usize = 16;

/// How to start the child: program, arguments, working directory.
///
/// On unix the child leads its own process group and is stopped by signalling
/// the whole group, so processes it starts (the binary `go run` builds, for
/// one) go down with it. Elsewhere only the runner itself is killed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>, working_dir: PathBuf) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir,
        }
    }

    /// `runner[0] runner[1..] <entry file>`, run from the working directory.
    pub fn from_settings(settings: &Settings) -> Self {
        let (program, leading) = match settings.runner().split_first() {
            Some((program, rest)) => (program.clone(), rest.to_vec()),
            None => (String::new(), Vec::new()),
        };
        let mut args = leading;
        args.push(settings.entry_file().to_string_lossy().into_owned());
        Self::new(program, args, settings.working_dir().to_path_buf())
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        command
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Identity of a spawned child. `generation` increases by one per spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildInfo {
    pub pid: Option<u32>,
    pub generation: u64,
}

/// Point-in-time view of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub current: Option<ChildInfo>,
    pub alive: bool,
    pub spawned: u64,
}

pub(crate) enum SupervisorRequest {
    Reload {
        respond_to: oneshot::Sender<Result<Option<ChildInfo>, ProcessError>>,
    },
    Terminate {
        respond_to: oneshot::Sender<Result<(), ProcessError>>,
    },
    Snapshot {
        respond_to: oneshot::Sender<Snapshot>,
    },
}

/// Cloneable front door to the supervisor task.
#[derive(Clone)]
pub struct SupervisorHandle {
    tx: mpsc::Sender<SupervisorRequest>,
}

impl SupervisorHandle {
    pub(crate) fn new(tx: mpsc::Sender<SupervisorRequest>) -> Self {
        Self { tx }
    }

    /// Kill the current child if any, then start a new one.
    ///
    /// Returns `None` once the supervisor has stopped for shutdown; nothing is
    /// started then.
    pub async fn reload(&self) -> Result<Option<ChildInfo>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        if !self.send(SupervisorRequest::Reload { respond_to: tx }).await {
            return Ok(None);
        }
        let outcome = rx
            .await
            .map_err(|_| RuntimeError::ChannelClosed("supervisor response"))?;
        Ok(outcome?)
    }

    /// Kill the current child if any. No replacement is started.
    ///
    /// A stopped supervisor has already terminated its child, so this is then
    /// a no-op.
    pub async fn terminate(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        if !self.send(SupervisorRequest::Terminate { respond_to: tx }).await {
            return Ok(());
        }
        let outcome = rx
            .await
            .map_err(|_| RuntimeError::ChannelClosed("supervisor response"))?;
        Ok(outcome?)
    }

    pub async fn snapshot(&self) -> Result<Snapshot, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        if !self.send(SupervisorRequest::Snapshot { respond_to: tx }).await {
            return Err(RuntimeError::ChannelClosed("supervisor queue"));
        }
        rx.await
            .map_err(|_| RuntimeError::ChannelClosed("supervisor response"))
    }

    /// `false` when the supervisor no longer accepts requests.
    async fn send(&self, request: SupervisorRequest) -> bool {
        self.tx.send(request).await.is_ok()
    }
}

/// Owns at most one child process.
pub struct ProcessSupervisor {
    launch: LaunchSpec,
    child: Option<(Child, ChildInfo)>,
    spawned: u64,
}

impl ProcessSupervisor {
    pub fn new(launch: LaunchSpec) -> Self {
        Self {
            launch,
            child: None,
            spawned: 0,
        }
    }

    /// Move the supervisor into its own task.
    ///
    /// The task serves requests until `shutdown_rx` fires or every handle is
    /// dropped, then terminates whatever child is still running. Requests
    /// still queued at that point are answered without starting a child.
    pub fn spawn(
        self,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> (SupervisorHandle, JoinHandle<Result<(), RuntimeError>>) {
        let (tx, rx) = mpsc::channel(REQUEST_CAPACITY);
        let task = tokio::spawn(self.serve(rx, shutdown_rx));
        (SupervisorHandle::new(tx), task)
    }

    async fn serve(
        mut self,
        mut requests: mpsc::Receiver<SupervisorRequest>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), RuntimeError> {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                request = requests.recv() => {
                    let Some(request) = request else { break };
                    match request {
                        SupervisorRequest::Reload { respond_to } => {
                            let _ = respond_to.send(self.reload().await.map(Some));
                        }
                        SupervisorRequest::Terminate { respond_to } => {
                            let _ = respond_to.send(self.terminate().await.map(|_| ()));
                        }
                        SupervisorRequest::Snapshot { respond_to } => {
                            let _ = respond_to.send(self.snapshot());
                        }
                    }
                }
            }
        }

        let stopped = self.terminate().await;

        requests.close();
        let mut drained = 0usize;
        while let Some(request) = requests.recv().await {
            drained += 1;
            match request {
                SupervisorRequest::Reload { respond_to } => {
                    let _ = respond_to.send(Ok(None));
                }
                SupervisorRequest::Terminate { respond_to } => {
                    let _ = respond_to.send(Ok(()));
                }
                SupervisorRequest::Snapshot { respond_to } => {
                    let _ = respond_to.send(self.snapshot());
                }
            }
        }
        if drained > 0 {
            tracing::debug!(drained, "answered requests queued behind shutdown");
        }

        stopped?;
        Ok(())
    }

    /// Kill-if-alive, then spawn.
    pub async fn reload(&mut self) -> Result<ChildInfo, ProcessError> {
        self.terminate().await?;

        let child = self
            .launch
            .command()
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: self.launch.to_string(),
                source,
            })?;

        self.spawned += 1;
        let info = ChildInfo {
            pid: child.id(),
            generation: self.spawned,
        };
        tracing::debug!(pid = ?info.pid, generation = info.generation, "child started");
        self.child = Some((child, info));
        Ok(info)
    }

    /// Kill and reap the current child. A child that already exited is not an
    /// error; its exit status is returned.
    pub async fn terminate(&mut self) -> Result<Option<ExitStatus>, ProcessError> {
        let Some((mut child, info)) = self.child.take() else {
            return Ok(None);
        };
        let pid = info.pid.unwrap_or_default();

        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(pid, %status, "child had already exited");
                return Ok(Some(status));
            }
            Ok(None) => {}
            Err(source) => return Err(ProcessError::Kill { pid, source }),
        }

        #[cfg(unix)]
        kill_group(pid).map_err(|source| ProcessError::Kill { pid, source })?;

        if let Err(source) = child.start_kill() {
            // Lost the race with a natural exit.
            if let Ok(Some(status)) = child.try_wait() {
                return Ok(Some(status));
            }
            return Err(ProcessError::Kill { pid, source });
        }

        let status = child
            .wait()
            .await
            .map_err(|source| ProcessError::Kill { pid, source })?;
        tracing::debug!(pid, %status, generation = info.generation, "child stopped");
        Ok(Some(status))
    }

    pub fn snapshot(&mut self) -> Snapshot {
        let (current, alive) = match self.child.as_mut() {
            Some((child, info)) => (Some(*info), matches!(child.try_wait(), Ok(None))),
            None => (None, false),
        };
        Snapshot {
            current,
            alive,
            spawned: self.spawned,
        }
    }
}

/// SIGKILL the process group led by `pid`. A group that is already gone is
/// not an error.
#[cfg(unix)]
fn kill_group(pid: u32) -> std::io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return Ok(());
    };
    if raw <= 0 {
        return Ok(());
    }
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(errno.into()),
    }
}
