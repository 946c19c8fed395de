//! Human-facing status lines on stdout, `[relaunch]`-prefixed and colored.
//!
//! Never machine-parsed. Diagnostics go through `tracing` instead.

use colored::Colorize;
use relaunch_core::Settings;

use crate::supervisor::{ChildInfo, LaunchSpec};

fn tag() -> colored::ColoredString {
    "[relaunch]".bold().cyan()
}

pub fn info(message: &str) {
    println!("{} {}", tag(), message.yellow());
}

pub fn success(message: &str) {
    println!("{} {}", tag(), message.green());
}

/// Fatal error line on stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", tag(), message.bold().red());
}

/// Startup banner: what is watched, what is ignored, how to drive the tool.
pub fn banner(settings: &Settings, watched_files: usize, launch: &LaunchSpec) {
    let extensions: Vec<&str> = settings
        .watch_extensions()
        .iter()
        .map(|e| e.as_str())
        .collect();

    info(&format!("watching extension(s): {}", extensions.join(", ")));
    info(&format!("ignoring folder(s): {}", settings.ignore_dirs().join(", ")));
    info(&format!("watching {watched_files} file(s)"));
    println!(
        "{} {}{}",
        tag(),
        "to restart enter ".yellow(),
        "`rs`".green()
    );
    println!("{} {}{}", tag(), "to quit enter ".yellow(), "`q`".red());
    success(&format!("starting `{launch}`"));
}

pub fn restarting(reason: &str) {
    info(&format!("restarting: {reason}"));
}

pub fn started(child: &ChildInfo) {
    match child.pid {
        Some(pid) => success(&format!("running (pid {pid}), waiting for further changes")),
        None => success("running, waiting for further changes"),
    }
}

pub fn quitting() {
    info("quitting");
}
