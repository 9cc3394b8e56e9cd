//! Format of the diagnostics plotline writes to standard error.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How `plotline` renders its tracing events on standard error.
///
/// Selected with `--log-format`, `PLOTLINE_LOG_FORMAT` or `log_format` in the
/// configuration file. Command reports on standard output are unaffected.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, with the plugin id, library path and
    /// validation outcome as top-level fields.
    Json,
    /// One terse line per event, for reading plugin validation progress in a
    /// terminal.
    #[default]
    Compact,
}

/// Error returned when `--log-format` names neither `json` nor `compact`.
pub type LogFormatParseError = strum::ParseError;
