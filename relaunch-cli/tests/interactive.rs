//! Drives the binary over piped stdin/stdout like a developer at a terminal.
#![cfg(unix)]

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread::sleep;
use std::time::{Duration, Instant};

use tempfile::TempDir;

struct Session {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
}

impl Session {
    /// Project with a shell-script entry file that sleeps, run through `sh`.
    fn start(dir: &Path) -> Self {
        std::fs::write(dir.join("main.sh"), "echo child-up\nexec sleep 30\n").expect("write entry");
        std::fs::write(
            dir.join("relaunch.json"),
            r#"{"mainFile":"main.sh","watchExtensions":[".sh"],"runner":["sh"],"debounceMs":50}"#,
        )
        .expect("write config");

        let mut child = Command::new(env!("CARGO_BIN_EXE_relaunch"))
            .current_dir(dir)
            .env("NO_COLOR", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn relaunch");

        let stdin = child.stdin.take().expect("stdin");
        let stdout = child.stdout.take().expect("stdout");
        let (tx, lines) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Self {
            child,
            stdin,
            lines,
        }
    }

    /// Wait for the next "running (pid N)" status line and return N.
    fn next_child_pid(&self, timeout: Duration) -> Option<u32> {
        let deadline = Instant::now() + timeout;
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            let line = self.lines.recv_timeout(left).ok()?;
            if let Some(pid) = parse_pid(&line) {
                return Some(pid);
            }
        }
        None
    }

    fn send(&mut self, command: &str) {
        writeln!(self.stdin, "{command}").expect("write command");
        self.stdin.flush().expect("flush");
    }

    fn wait_exit(&mut self, timeout: Duration) -> Option<std::process::ExitStatus> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Some(status);
            }
            sleep(Duration::from_millis(50));
        }
        None
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn parse_pid(line: &str) -> Option<u32> {
    let rest = &line[line.find("(pid ")? + 5..];
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(target_os = "linux")]
fn pid_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[test]
fn quit_stops_child_before_exiting() {
    let dir = TempDir::new().expect("tempdir");
    let mut session = Session::start(dir.path());

    let pid = session
        .next_child_pid(Duration::from_secs(10))
        .expect("child started");

    session.send("q");
    let status = session
        .wait_exit(Duration::from_secs(10))
        .expect("relaunch exited after q");
    assert!(status.success(), "q should exit cleanly, got {status}");

    #[cfg(target_os = "linux")]
    assert!(!pid_alive(pid), "child {pid} still alive after q");
    #[cfg(not(target_os = "linux"))]
    let _ = pid;
}

#[test]
fn rs_replaces_the_child() {
    let dir = TempDir::new().expect("tempdir");
    let mut session = Session::start(dir.path());

    let first = session
        .next_child_pid(Duration::from_secs(10))
        .expect("first child");
    session.send("rs");
    let second = session
        .next_child_pid(Duration::from_secs(10))
        .expect("second child");
    assert_ne!(first, second);

    #[cfg(target_os = "linux")]
    assert!(!pid_alive(first), "old child {first} still alive after rs");

    session.send("q");
    assert!(session.wait_exit(Duration::from_secs(10)).is_some());
}

#[test]
fn editing_a_watched_file_restarts_the_child() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("helper.sh"), "# v1\n").expect("write helper");
    let mut session = Session::start(dir.path());

    let first = session
        .next_child_pid(Duration::from_secs(10))
        .expect("first child");

    std::fs::write(dir.path().join("helper.sh"), "# v2\n").expect("edit helper");
    let second = session
        .next_child_pid(Duration::from_secs(10))
        .expect("restart after edit");
    assert_ne!(first, second);

    session.send("q");
    assert!(session.wait_exit(Duration::from_secs(10)).is_some());
}
