//! Rendering of command results.
//!
//! Commands build serialisable reports ([`models`]); this module writes them
//! either as one JSON document or as aligned human-readable lines.

mod models;
mod render;

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;

use crate::errors::AppError;

pub(crate) use self::models::{CheckReport, PluginReport, RemovalReport};
pub(crate) use self::render::Render;

/// Output format selection for command results.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    #[default]
    Auto,
    /// Always render human-readable output.
    Human,
    /// Always emit JSON documents.
    Json,
}

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolvedOutputFormat {
    /// Human-readable lines.
    Human,
    /// One pretty-printed JSON document.
    Json,
}

impl OutputFormat {
    /// Resolves the output format based on whether stdout is a terminal.
    #[must_use]
    pub const fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto if stdout_is_terminal => ResolvedOutputFormat::Human,
            Self::Auto | Self::Json => ResolvedOutputFormat::Json,
            Self::Human => ResolvedOutputFormat::Human,
        }
    }
}

/// Writes `report` to `stdout` in the requested format.
pub(crate) fn emit<W, R>(
    stdout: &mut W,
    format: ResolvedOutputFormat,
    report: &R,
) -> Result<(), AppError>
where
    W: Write,
    R: Serialize + Render + ?Sized,
{
    match format {
        ResolvedOutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *stdout, report).map_err(AppError::SerialiseOutput)?;
            stdout.write_all(b"\n")?;
        }
        ResolvedOutputFormat::Human => report.render(stdout)?,
    }
    stdout.flush()?;
    Ok(())
}
