//! Out-of-process library validation.
//!
//! [`ProcessValidator`] implements [`LibraryValidator`] by spawning the
//! validator executable with the library path and symbol name as its final
//! arguments, then polling the child until it exits or the timeout expires.
//! The verdict travels back through the exit code alone: standard output is
//! discarded and standard error is only logged at debug level.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use plotline_config::{Config, default_validation_timeout, default_validator_path};
use tracing::{debug, warn};

use crate::validation::{AbnormalExit, ValidationOutcome, ValidationResult};

/// Tracing target for validator process operations.
const PROCESS_TARGET: &str = "plotline_plugins::process";

/// Interval between child status checks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Validates a plugin library without loading it into the calling process.
///
/// The production implementation is [`ProcessValidator`]. Test code can
/// implement this trait to script validation outcomes.
///
/// # Example
///
/// ```
/// use std::path::Path;
///
/// use plotline_plugins::{LibraryValidator, ValidationOutcome, ValidationResult};
///
/// struct AlwaysValid;
///
/// impl LibraryValidator for AlwaysValid {
///     fn validate(&self, _library_path: &Path, _symbol_name: &str) -> ValidationOutcome {
///         ValidationOutcome::Completed(ValidationResult::Valid)
///     }
/// }
/// ```
pub trait LibraryValidator: Send + Sync {
    /// Validates `library_path` exporting the factory `symbol_name`.
    ///
    /// Implementations block until a verdict is known and must bound that
    /// wait themselves.
    fn validate(&self, library_path: &Path, symbol_name: &str) -> ValidationOutcome;
}

/// Runs the validator executable as a child process.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use std::time::Duration;
///
/// use plotline_plugins::{LibraryValidator, ProcessValidator};
///
/// let validator = ProcessValidator::new("/opt/plotline/plotline-plugin-validator")
///     .with_timeout(Duration::from_millis(500));
/// let outcome = validator.validate(Path::new("/opt/plugins/libtable.so"), "plotline_create_plugin");
/// println!("{outcome}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessValidator {
    program: PathBuf,
    leading_args: Vec<OsString>,
    timeout: Duration,
}

impl ProcessValidator {
    /// Creates a validator running `program` with the default timeout.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            timeout: default_validation_timeout(),
        }
    }

    /// Builds the validator described by the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.validator_path().into_std_path_buf())
            .with_timeout(config.validation_timeout())
    }

    /// Finds the validator installed next to the running executable.
    ///
    /// Returns `None` when no such file exists.
    #[must_use]
    pub fn locate_sibling() -> Option<Self> {
        let candidate = default_validator_path().into_std_path_buf();
        candidate.is_file().then(|| Self::new(candidate))
    }

    /// Sets the wall-clock budget for one run.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Inserts arguments before the library path and symbol name.
    #[must_use]
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the executable this validator runs.
    #[must_use]
    pub fn program(&self) -> &Path {
        self.program.as_path()
    }

    /// Returns the per-run timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, library_path: &Path, symbol_name: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .arg(library_path)
            .arg(symbol_name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }
}

impl LibraryValidator for ProcessValidator {
    fn validate(&self, library_path: &Path, symbol_name: &str) -> ValidationOutcome {
        debug!(
            target: PROCESS_TARGET,
            validator = %self.program.display(),
            library = %library_path.display(),
            symbol = symbol_name,
            "spawning validator process"
        );

        let mut child = match self.command(library_path, symbol_name).spawn() {
            Ok(child) => child,
            Err(error) => {
                warn!(
                    target: PROCESS_TARGET,
                    validator = %self.program.display(),
                    %error,
                    "validator could not be launched"
                );
                return ValidationOutcome::Unavailable {
                    reason: format!("failed to launch {}: {error}", self.program.display()),
                };
            }
        };

        let start = Instant::now();
        let stderr = child.stderr.take().and_then(spawn_stderr_drain);
        let outcome = wait_for_exit(&mut child, self.timeout);
        if !matches!(outcome, ValidationOutcome::TimedOut) {
            let remaining = self.timeout.saturating_sub(start.elapsed());
            log_stderr(library_path, stderr, remaining);
        }
        debug!(
            target: PROCESS_TARGET,
            library = %library_path.display(),
            %outcome,
            "validator finished"
        );
        outcome
    }
}

/// Reads stderr on a helper thread so a chatty child cannot fill the pipe.
///
/// The text arrives on the returned channel at end of file. A process the
/// validator left running can hold the pipe open indefinitely, so readers
/// must bound their wait; the helper thread is detached.
fn spawn_stderr_drain(stderr: ChildStderr) -> Option<Receiver<String>> {
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name(String::from("validator-stderr"))
        .spawn(move || {
            let mut buffer = String::new();
            drop(stderr.take(64 * 1024).read_to_string(&mut buffer));
            drop(sender.send(buffer));
        })
        .ok()
        .map(|_| receiver)
}

/// Logs the drained stderr if it arrives within `wait`.
fn log_stderr(library_path: &Path, drain: Option<Receiver<String>>, wait: Duration) {
    let Some(receiver) = drain else {
        return;
    };
    let Ok(output) = receiver.recv_timeout(wait) else {
        debug!(
            target: PROCESS_TARGET,
            library = %library_path.display(),
            "validator stderr still open after exit; not waiting for it"
        );
        return;
    };
    if !output.trim().is_empty() {
        debug!(
            target: PROCESS_TARGET,
            library = %library_path.display(),
            stderr = %output.trim(),
            "validator stderr output"
        );
    }
}

/// Polls the child until it exits, killing and reaping it on timeout.
fn wait_for_exit(child: &mut Child, timeout: Duration) -> ValidationOutcome {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return outcome_from_status(status),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    warn!(
                        target: PROCESS_TARGET,
                        timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        "validator timed out, killing process"
                    );
                    drop(child.kill());
                    drop(child.wait());
                    return ValidationOutcome::TimedOut;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(error) => {
                warn!(target: PROCESS_TARGET, %error, "failed to poll validator process");
                drop(child.kill());
                drop(child.wait());
                return ValidationOutcome::Unavailable {
                    reason: format!("failed to supervise validator: {error}"),
                };
            }
        }
    }
}

/// Maps an exit status to an outcome: known codes complete, the rest crash.
fn outcome_from_status(status: ExitStatus) -> ValidationOutcome {
    match status.code() {
        Some(code) => ValidationResult::from_exit_code(code).map_or_else(
            || ValidationOutcome::Crashed(AbnormalExit::with_code(code)),
            ValidationOutcome::Completed,
        ),
        None => ValidationOutcome::Crashed(
            termination_signal(status).map_or_else(AbnormalExit::unknown, AbnormalExit::with_signal),
        ),
    }
}

#[cfg(unix)]
fn termination_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
const fn termination_signal(_status: ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests;
