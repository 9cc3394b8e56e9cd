//! Domain errors raised by plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint.
//!
//! A plugin that fails validation is not an error at this level: the verdict
//! is recorded in the loader's [`PluginStatus`](crate::PluginStatus).

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::descriptor::PluginId;

/// Errors arising from plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No plugin with the given identifier is registered.
    #[error("plugin {id} is not registered")]
    UnknownPlugin {
        /// Identifier that was looked up.
        id: PluginId,
    },

    /// The plugin is being validated and cannot be changed until it finishes.
    #[error("plugin {id} is being validated; try again once validation completes")]
    ValidationInProgress {
        /// Identifier of the busy plugin.
        id: PluginId,
    },

    /// A library path or symbol name cannot identify a plugin factory.
    #[error("invalid plugin descriptor: {message}")]
    InvalidDescriptor {
        /// Description of the problem.
        message: String,
    },

    /// The operation needs a loaded plugin instance.
    #[error("plugin {id} is not loaded")]
    NotLoaded {
        /// Identifier of the plugin.
        id: PluginId,
    },

    /// The plugin refused a setting value.
    #[error("plugin rejected setting '{name}'")]
    SettingRejected {
        /// Setting name.
        name: String,
    },

    /// The background validation thread could not be started.
    #[error("failed to start validation for plugin {id}: {source}")]
    WorkerSpawn {
        /// Identifier of the plugin.
        id: PluginId,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Reading or writing the plugin list failed.
    #[error("plugin list I/O error at {path}: {source}")]
    StoreIo {
        /// Path of the plugin list.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plugin list is not a valid document.
    #[error("plugin list at {path} is malformed: {source}")]
    StoreFormat {
        /// Path of the plugin list.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// The plugin list was written by an incompatible version.
    #[error("plugin list at {path} has unsupported version {version}")]
    UnsupportedStoreVersion {
        /// Path of the plugin list.
        path: PathBuf,
        /// Version found in the document.
        version: u32,
    },
}
