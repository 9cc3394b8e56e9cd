//! Entry point for the `plotline` plugin manager.
//!
//! The binary delegates to [`plotline_cli::run`], which loads configuration,
//! opens the plugin registry and executes one command against it.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    plotline_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
