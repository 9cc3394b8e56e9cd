//! Serialisable command results.

use plotline_plugin_abi::{PluginInfo, SettingItem};
use plotline_plugins::{PluginLoader, PluginStatus, ValidationOutcome};
use serde::Serialize;

/// One registered plugin and its load state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PluginReport {
    pub(crate) id: u64,
    pub(crate) libpath: String,
    pub(crate) symbolname: String,
    pub(crate) enabled: bool,
    pub(crate) status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) info: Option<InfoReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) settings: Vec<SettingReport>,
}

/// Metadata of a loaded plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct InfoReport {
    pub(crate) name: String,
    pub(crate) version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) description: String,
}

/// One plugin setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SettingReport {
    pub(crate) name: String,
    pub(crate) kind: &'static str,
    pub(crate) value: String,
}

/// Result of a `remove` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RemovalReport {
    pub(crate) id: u64,
    pub(crate) libpath: String,
    pub(crate) symbolname: String,
}

/// Result of a `check` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct CheckReport {
    pub(crate) libpath: String,
    pub(crate) symbolname: String,
    pub(crate) valid: bool,
    pub(crate) verdict: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) code: Option<u8>,
}

impl PluginReport {
    /// Summarises a loader without reading settings.
    pub(crate) fn from_loader(loader: &PluginLoader) -> Self {
        let descriptor = loader.descriptor();
        let status = loader.status();
        let (reason, code) = match &status {
            PluginStatus::Failed(failure) => (
                Some(failure.to_string()),
                failure.result().map(|result| result.code()),
            ),
            PluginStatus::Disabled | PluginStatus::Validating | PluginStatus::Loaded => {
                (None, None)
            }
        };
        Self {
            id: loader.id().get(),
            libpath: descriptor.library_path().display().to_string(),
            symbolname: descriptor.symbol_name().to_owned(),
            enabled: descriptor.is_enabled(),
            status: status.as_str(),
            reason,
            code,
            info: loader.plugin().map(|plugin| InfoReport::from(plugin.info())),
            settings: Vec::new(),
        }
    }

    /// Attaches the plugin's current settings.
    pub(crate) fn with_settings(mut self, settings: &[SettingItem]) -> Self {
        self.settings = settings.iter().map(SettingReport::from).collect();
        self
    }
}

impl From<&PluginInfo> for InfoReport {
    fn from(info: &PluginInfo) -> Self {
        Self {
            name: info.name().to_owned(),
            version: info.version().to_owned(),
            description: info.description().to_owned(),
        }
    }
}

impl From<&SettingItem> for SettingReport {
    fn from(item: &SettingItem) -> Self {
        Self {
            name: item.name().to_owned(),
            kind: item.value().kind().as_str(),
            value: item.value().to_string(),
        }
    }
}

impl CheckReport {
    pub(crate) fn new(libpath: String, symbolname: String, outcome: &ValidationOutcome) -> Self {
        let result = outcome.result();
        Self {
            libpath,
            symbolname,
            valid: result.is_some_and(|verdict| verdict.is_valid()),
            verdict: outcome.to_string(),
            code: result.map(|verdict| verdict.code()),
        }
    }
}
