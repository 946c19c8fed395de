//! relaunch: restart a program whenever its sources change.
//!
//! # Usage
//!
//! ```text
//! relaunch [ENTRY]
//! ```
//!
//! Reads `relaunch.json` from the current directory if present. While running,
//! enter `rs` to force a restart and `q` to stop the program and exit.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use relaunch_core::{ConfigError, Settings};
use relaunch_runtime::{start_blocking, status, ErrorKind, RuntimeError};

#[derive(Parser, Debug)]
#[command(
    name = "relaunch",
    version,
    about = "Restart a program whenever its source files change",
    long_about = None,
)]
struct Cli {
    /// Entry file handed to the runner (default runner: `go run`).
    /// Optional when `relaunch.json` sets `mainFile`.
    entry: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            status::error(&format!("{err:#}"));
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.entry).context("invalid configuration")?;
    start_blocking(settings).context("watcher stopped")?;
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    let kind = if let Some(err) = err.downcast_ref::<RuntimeError>() {
        err.kind()
    } else if err.downcast_ref::<ConfigError>().is_some() {
        ErrorKind::Config
    } else {
        ErrorKind::Internal
    };
    kind.exit_code()
}
