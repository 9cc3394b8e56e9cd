//! Identity and location of a registered plugin.

use std::fmt;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Registry-assigned plugin identifier.
///
/// Identifiers start at 1 and are never reused by the registry that issued
/// them. They display with a leading `#`, which [`FromStr`] also accepts.
///
/// ```
/// use plotline_plugins::PluginId;
///
/// let id: PluginId = "#3".parse().expect("valid id");
/// assert_eq!(id.get(), 3);
/// assert_eq!(id.to_string(), "#3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(u64);

impl PluginId {
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for PluginId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        digits.parse().map(Self)
    }
}

/// Library path, entry symbol and enabled flag of one plugin.
///
/// # Example
///
/// ```
/// use plotline_plugins::PluginDescriptor;
///
/// let descriptor = PluginDescriptor::new("/opt/plugins/libtable.so", "plotline_create_plugin");
/// assert!(!descriptor.is_enabled());
/// assert!(descriptor.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    library_path: PathBuf,
    symbol_name: String,
    enabled: bool,
}

impl PluginDescriptor {
    /// Creates a disabled descriptor.
    #[must_use]
    pub fn new(library_path: impl Into<PathBuf>, symbol_name: impl Into<String>) -> Self {
        Self {
            library_path: library_path.into(),
            symbol_name: symbol_name.into(),
            enabled: false,
        }
    }

    /// Returns the shared library path.
    #[must_use]
    pub fn library_path(&self) -> &Path {
        self.library_path.as_path()
    }

    /// Returns the exported factory symbol.
    #[must_use]
    pub const fn symbol_name(&self) -> &str {
        self.symbol_name.as_str()
    }

    /// Returns `true` when the plugin is meant to be loaded.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Checks that the path and symbol can name a factory at all.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidDescriptor`] when the path or symbol is
    /// empty, or the symbol contains a NUL byte.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.library_path.as_os_str().is_empty() {
            return Err(PluginError::InvalidDescriptor {
                message: String::from("library path must not be empty"),
            });
        }
        if self.symbol_name.trim().is_empty() {
            return Err(PluginError::InvalidDescriptor {
                message: String::from("symbol name must not be empty"),
            });
        }
        if self.symbol_name.contains('\0') {
            return Err(PluginError::InvalidDescriptor {
                message: format!("symbol name {:?} contains a NUL byte", self.symbol_name),
            });
        }
        Ok(())
    }

    pub(crate) fn set_library_path(&mut self, library_path: PathBuf) {
        self.library_path = library_path;
    }

    pub(crate) fn set_symbol_name(&mut self, symbol_name: String) {
        self.symbol_name = symbol_name;
    }

    pub(crate) const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
