//! Configuration loading helpers for the plotline CLI.
//!
//! Leading arguments that name configuration flags are routed to
//! `ortho_config`; everything from the first other token onwards belongs to
//! the clap command parser.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use plotline_config::Config;

use crate::errors::AppError;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of [`plotline_config::Config`].
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--registry-path",
    "--plugin-dir",
    "--validator-path",
    "--validation-timeout-ms",
    "--missing-validator",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// `args` starts with the program name and holds only configuration
    /// flags, which must precede the command.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

/// Layers defaults, files, environment and flags through `ortho_config`.
pub(crate) struct OrthoConfigLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        let config =
            Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)?;
        config.validate()?;
        Ok(config)
    }
}

impl OrthoConfigLoader {
    fn process_config_flag(argument: &OsStr) -> FlagAction {
        let argument_text = argument.to_string_lossy();
        let Some(flag_text) = argument_text.strip_prefix("--") else {
            return FlagAction::Skip;
        };
        let (name, has_inline_value) = flag_text
            .split_once('=')
            .map_or((flag_text, false), |(name, _)| (name, true));

        let known = CONFIG_CLI_FLAGS
            .iter()
            .any(|flag| flag.strip_prefix("--") == Some(name));
        if known {
            FlagAction::Include {
                needs_value: !has_inline_value,
            }
        } else {
            FlagAction::Skip
        }
    }
}

/// Arguments partitioned between the configuration loader and clap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    /// Program name followed by the configuration flags and their values.
    pub(crate) config_arguments: Vec<OsString>,
    /// Program name followed by the command tokens.
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut remaining = args.iter();
    let program: Vec<OsString> = remaining.next().cloned().into_iter().collect();
    let mut config_arguments = program.clone();

    let mut pending_value = false;
    let mut command_arguments = program;
    for argument in remaining.by_ref() {
        if pending_value {
            config_arguments.push(argument.clone());
            pending_value = false;
            continue;
        }
        match OrthoConfigLoader::process_config_flag(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                pending_value = needs_value;
            }
            FlagAction::Skip => {
                command_arguments.push(argument.clone());
                break;
            }
        }
    }
    command_arguments.extend(remaining.cloned());

    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}
