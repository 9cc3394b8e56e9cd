//! Out-of-process plugin validator.
//!
//! Usage: `plotline-plugin-validator <library-path> <symbol-name>`.
//!
//! The process opens the library, resolves the factory, creates and destroys
//! one instance, and reports the verdict through its exit code (see
//! [`plotline_plugins::ValidationResult`]). It writes nothing to stdout and
//! installs no log subscriber. A library that crashes takes down only this
//! process, which the host observes as an abnormal exit.

use std::process::ExitCode;

use plotline_plugins::probe::probe_from_args;

fn main() -> ExitCode {
    // SAFETY: running foreign initialisers and factories is this process's
    // whole purpose; the host treats any crash as a verdict.
    let result = unsafe { probe_from_args(std::env::args_os().skip(1)) };
    ExitCode::from(result)
}
