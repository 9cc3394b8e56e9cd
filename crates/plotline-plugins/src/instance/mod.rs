//! A plugin instance loaded into the host.

use std::path::Path;

use plotline_plugin_abi::{PluginInfo, SettingItem, SettingValue};

use crate::error::PluginError;
use crate::library::PluginImage;

/// Version reported for plugins whose `info` entry fails.
const UNKNOWN_VERSION: &str = "unknown";

/// Loaded plugin: the library image plus the metadata read at load time.
///
/// Dropping the value destroys the instance and then unloads the library.
#[derive(Debug)]
pub struct LoadedPlugin {
    image: PluginImage,
    info: PluginInfo,
}

impl LoadedPlugin {
    /// Reads the instance metadata and takes ownership of the image.
    ///
    /// When the plugin cannot describe itself the file stem of
    /// `library_path` stands in for its name.
    #[must_use]
    pub fn from_image(mut image: PluginImage, library_path: &Path) -> Self {
        let info = image
            .info()
            .unwrap_or_else(|| fallback_info(library_path));
        Self { image, info }
    }

    /// Returns the metadata reported when the plugin was loaded.
    #[must_use]
    pub const fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// Reads the plugin's current settings.
    pub fn settings(&mut self) -> Vec<SettingItem> {
        self.image.settings()
    }

    /// Assigns a setting by name.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::SettingRejected`] when the plugin refuses the
    /// name or value.
    pub fn set_setting(&mut self, name: &str, value: &SettingValue) -> Result<(), PluginError> {
        if self.image.set_setting(name, value) {
            Ok(())
        } else {
            Err(PluginError::SettingRejected {
                name: name.to_owned(),
            })
        }
    }
}

fn fallback_info(library_path: &Path) -> PluginInfo {
    let name = library_path
        .file_stem()
        .map_or_else(String::new, |stem| stem.to_string_lossy().into_owned());
    PluginInfo::new(name, UNKNOWN_VERSION)
}
