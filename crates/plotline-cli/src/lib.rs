//! Command-line runtime for managing plotline plugins.
//!
//! The crate owns argument parsing, configuration bootstrapping, telemetry
//! set-up and the plugin commands. [`run`] is used by the `plotline` binary
//! and by tests, which substitute the output streams. The crate also ships
//! the `plotline-plugin-validator` binary that the registry launches to vet
//! plugin libraries out of process.

use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use clap::Parser;

mod cli;
mod commands;
mod config;
mod errors;
pub mod output;
mod telemetry;

use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;
pub use output::{OutputFormat, ResolvedOutputFormat};

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
    stdout_is_terminal: bool,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal: io::stdout().is_terminal(),
        }
    }

    #[cfg(test)]
    pub(crate) const fn with_terminal_status(
        stdout: &'a mut W,
        stderr: &'a mut E,
        stdout_is_terminal: bool,
    ) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal,
        }
    }

    pub(crate) const fn stdout_is_terminal(&self) -> bool {
        self.stdout_is_terminal
    }
}

/// Runs the CLI using the provided arguments and IO handles.
///
/// Results go to `stdout`; usage errors and failures go to `stderr` and
/// yield [`ExitCode::FAILURE`].
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    io: &mut IoStreams<'_, W, E>,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);

    let cli = match Cli::try_parse_from(&split.command_arguments) {
        Ok(cli) => cli,
        Err(error) => return report_usage(error, io),
    };

    let result = loader
        .load(&split.config_arguments)
        .and_then(|config| {
            telemetry::initialise(&config)?;
            let format = cli.output.resolve(io.stdout_is_terminal());
            commands::execute(cli.command, &config, format, &mut *io.stdout)
        });

    match result {
        Ok(exit_code) => exit_code,
        Err(error) => {
            drop(writeln!(io.stderr, "{error}"));
            ExitCode::FAILURE
        }
    }
}

/// Prints clap's message: help and version to stdout, usage errors to stderr.
fn report_usage<W: Write, E: Write>(
    error: clap::Error,
    io: &mut IoStreams<'_, W, E>,
) -> ExitCode {
    if error.use_stderr() {
        drop(write!(io.stderr, "{}", AppError::CliUsage(error)));
        ExitCode::FAILURE
    } else {
        drop(write!(io.stdout, "{}", error.render()));
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests;
