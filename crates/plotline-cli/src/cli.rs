//! CLI argument definitions for the `plotline` plugin manager.
//!
//! Configuration flags (`--log-filter`, `--registry-path` and friends) are
//! not declared here: they are split off before parsing and handed to the
//! configuration loader.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use plotline_plugins::PluginId;

use crate::output::OutputFormat;

/// Command-line interface for managing plotline plugins.
#[derive(Parser, Debug)]
#[command(
    name = "plotline",
    about = "Manage and validate plotline plugins",
    disable_help_subcommand = true
)]
pub(crate) struct Cli {
    /// Controls how results are rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
    pub(crate) output: OutputFormat,
    /// The plugin command to run.
    #[command(subcommand)]
    pub(crate) command: PluginCommand,
}

/// Plugin management commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum PluginCommand {
    /// Lists registered plugins with their load status.
    List,
    /// Registers a plugin library and validates it.
    Add {
        /// Path to the plugin's shared library.
        #[arg(value_name = "LIBPATH")]
        library_path: PathBuf,
        /// Name of the factory symbol the library exports.
        #[arg(value_name = "SYMBOL")]
        symbol_name: String,
    },
    /// Unregisters a plugin.
    Remove {
        /// Plugin identifier as printed by `list`, with or without `#`.
        #[arg(value_name = "ID")]
        id: PluginId,
    },
    /// Points a plugin at another library or symbol and re-validates it.
    Edit {
        /// Plugin identifier as printed by `list`, with or without `#`.
        #[arg(value_name = "ID")]
        id: PluginId,
        /// Path to the plugin's shared library.
        #[arg(value_name = "LIBPATH")]
        library_path: PathBuf,
        /// Name of the factory symbol the library exports.
        #[arg(value_name = "SYMBOL")]
        symbol_name: String,
    },
    /// Prints the metadata and settings of a loaded plugin.
    Show {
        /// Plugin identifier as printed by `list`, with or without `#`.
        #[arg(value_name = "ID")]
        id: PluginId,
    },
    /// Assigns a setting on a loaded plugin and prints the resulting settings.
    ///
    /// Settings live in the plugin instance; they are not stored.
    Set {
        /// Plugin identifier as printed by `list`, with or without `#`.
        #[arg(value_name = "ID")]
        id: PluginId,
        /// Setting name as printed by `show`.
        #[arg(value_name = "NAME")]
        name: String,
        /// New value, parsed according to the setting's current kind.
        #[arg(value_name = "VALUE", allow_hyphen_values = true)]
        value: String,
    },
    /// Runs the validator against a library without registering it.
    Check {
        /// Path to the plugin's shared library.
        #[arg(value_name = "LIBPATH")]
        library_path: PathBuf,
        /// Name of the factory symbol the library exports.
        #[arg(value_name = "SYMBOL")]
        symbol_name: String,
    },
}
