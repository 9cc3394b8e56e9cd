//! Persisted plugin list.
//!
//! The list is a small JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "plugins": [
//!     { "libpath": "/opt/plotline/plugins/libplotline_table.so", "symbolname": "plotline_create_plugin" }
//!   ]
//! }
//! ```
//!
//! Only locations are stored. Every stored plugin is enabled, and therefore
//! re-validated, when the registry loads the list.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::PluginDescriptor;
use crate::error::PluginError;

/// Tracing target for plugin list persistence.
const STORE_TARGET: &str = "plotline_plugins::store";

/// Document version written by this crate.
pub const STORE_VERSION: u32 = 1;

/// Library name, without platform prefix or suffix, of the bundled plugin.
pub const DEFAULT_PLUGIN_LIBRARY: &str = "plotline_table";

/// Factory symbol exported by plotline plugins by convention.
pub const DEFAULT_SYMBOL_NAME: &str = "plotline_create_plugin";

/// One persisted plugin location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredPlugin {
    #[serde(rename = "libpath")]
    library_path: PathBuf,
    #[serde(rename = "symbolname")]
    symbol_name: String,
}

impl StoredPlugin {
    /// Creates a stored entry.
    #[must_use]
    pub fn new(library_path: impl Into<PathBuf>, symbol_name: impl Into<String>) -> Self {
        Self {
            library_path: library_path.into(),
            symbol_name: symbol_name.into(),
        }
    }

    /// Returns the shared library path.
    #[must_use]
    pub fn library_path(&self) -> &Path {
        self.library_path.as_path()
    }

    /// Returns the factory symbol.
    #[must_use]
    pub const fn symbol_name(&self) -> &str {
        self.symbol_name.as_str()
    }
}

impl From<&PluginDescriptor> for StoredPlugin {
    fn from(descriptor: &PluginDescriptor) -> Self {
        Self::new(descriptor.library_path(), descriptor.symbol_name())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    #[serde(default)]
    plugins: Vec<StoredPlugin>,
}

/// File-backed plugin list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    /// Creates a store backed by `path`. Nothing is read until [`Self::load`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Reads the stored plugins.
    ///
    /// Returns `Ok(None)` when the file does not exist. A file containing only
    /// whitespace reads as an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::StoreIo`] when the file cannot be read,
    /// [`PluginError::StoreFormat`] when it is not a plugin list, and
    /// [`PluginError::UnsupportedStoreVersion`] for documents from another
    /// version.
    pub fn load(&self) -> Result<Option<Vec<StoredPlugin>>, PluginError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(target: STORE_TARGET, path = %self.path.display(), "no plugin list");
                return Ok(None);
            }
            Err(error) => {
                return Err(PluginError::StoreIo {
                    path: self.path.clone(),
                    source: Arc::new(error),
                });
            }
        };
        if text.trim().is_empty() {
            return Ok(Some(Vec::new()));
        }

        let document: StoreDocument =
            serde_json::from_str(&text).map_err(|error| PluginError::StoreFormat {
                path: self.path.clone(),
                source: Arc::new(error),
            })?;
        if document.version != STORE_VERSION {
            return Err(PluginError::UnsupportedStoreVersion {
                path: self.path.clone(),
                version: document.version,
            });
        }
        debug!(
            target: STORE_TARGET,
            path = %self.path.display(),
            count = document.plugins.len(),
            "read plugin list"
        );
        Ok(Some(document.plugins))
    }

    /// Replaces the stored plugins.
    ///
    /// Parent directories are created as needed. The document is written to
    /// a sibling temporary file and renamed over the old list, so readers see
    /// either the old or the new list.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::StoreIo`] when any filesystem step fails.
    pub fn save(&self, plugins: &[StoredPlugin]) -> Result<(), PluginError> {
        let io_error = |source: std::io::Error| PluginError::StoreIo {
            path: self.path.clone(),
            source: Arc::new(source),
        };

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let document = StoreDocument {
            version: STORE_VERSION,
            plugins: plugins.to_vec(),
        };
        let mut json =
            serde_json::to_string_pretty(&document).map_err(|error| PluginError::StoreFormat {
                path: self.path.clone(),
                source: Arc::new(error),
            })?;
        json.push('\n');

        let staging = self.staging_path();
        fs::write(&staging, json).map_err(io_error)?;
        fs::rename(&staging, &self.path).map_err(io_error)?;
        debug!(
            target: STORE_TARGET,
            path = %self.path.display(),
            count = plugins.len(),
            "wrote plugin list"
        );
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Plugins registered when no list exists or the list is empty.
///
/// Currently the bundled data-table plugin inside `plugin_dir`.
///
/// ```
/// use std::path::Path;
///
/// use plotline_plugins::default_plugins;
///
/// let defaults = default_plugins(Path::new("/opt/plotline/plugins"));
/// assert_eq!(defaults.len(), 1);
/// assert_eq!(defaults[0].symbol_name(), "plotline_create_plugin");
/// ```
#[must_use]
pub fn default_plugins(plugin_dir: &Path) -> Vec<StoredPlugin> {
    let file_name = format!(
        "{}{DEFAULT_PLUGIN_LIBRARY}{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    );
    vec![StoredPlugin::new(
        plugin_dir.join(file_name),
        DEFAULT_SYMBOL_NAME,
    )]
}

#[cfg(test)]
mod tests;
