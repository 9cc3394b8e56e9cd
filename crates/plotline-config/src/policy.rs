use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What the host does when the validator executable cannot be launched.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MissingValidatorPolicy {
    /// Refuse to load the plugin.
    #[default]
    Reject,
    /// Load the plugin in-process without validation, logging a warning.
    LoadUnverified,
}

/// Errors encountered while parsing a [`MissingValidatorPolicy`] from text.
pub type MissingValidatorPolicyParseError = strum::ParseError;
