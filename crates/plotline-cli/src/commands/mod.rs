//! Execution of plugin commands against the registry.
//!
//! Every command except `check` opens a [`Session`]: the registry is loaded
//! from the configured store (or the default plugins), validation runs for
//! every entry, and the command waits until validation settles before it
//! reports. Commands that change the plugin list write it back before
//! reporting, so a failed save surfaces as an error.
//!
//! A plugin list that cannot be parsed, or that was written by a newer
//! store version, is ignored with a warning and the defaults are used. The
//! next command that changes the list replaces the file.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use plotline_config::Config;
use plotline_plugin_abi::SettingValue;
use plotline_plugins::{
    LibraryValidator, LoadedPlugin, PluginError, PluginId, PluginRegistry, ProcessValidator,
    RegistryStore, default_plugins,
};
use tracing::{debug, warn};

use crate::cli::PluginCommand;
use crate::errors::AppError;
use crate::output::{CheckReport, PluginReport, RemovalReport, ResolvedOutputFormat, emit};

/// Tracing target for CLI command execution.
const COMMAND_TARGET: &str = "plotline_cli::commands";

/// Slack granted on top of the validation timeout before giving up on a
/// settling registry.
const SETTLE_MARGIN: Duration = Duration::from_secs(1);

/// Runs `command` and writes its report to `stdout`.
pub(crate) fn execute<W: Write>(
    command: PluginCommand,
    config: &Config,
    format: ResolvedOutputFormat,
    stdout: &mut W,
) -> Result<ExitCode, AppError> {
    debug!(target: COMMAND_TARGET, ?command, "executing command");
    let validator: Arc<dyn LibraryValidator> = Arc::new(ProcessValidator::from_config(config));
    match command {
        PluginCommand::Check {
            library_path,
            symbol_name,
        } => check(validator.as_ref(), &library_path, symbol_name, format, stdout),
        PluginCommand::List => {
            let session = Session::open(validator, config)?;
            let reports: Vec<PluginReport> =
                session.registry.iter().map(PluginReport::from_loader).collect();
            emit(stdout, format, reports.as_slice())?;
            Ok(ExitCode::SUCCESS)
        }
        PluginCommand::Add {
            library_path,
            symbol_name,
        } => {
            let mut session = Session::open(validator, config)?;
            let id = session.registry.add(library_path, symbol_name)?;
            session.settle();
            session.save()?;
            emit(stdout, format, &session.report(id)?)?;
            Ok(ExitCode::SUCCESS)
        }
        PluginCommand::Remove { id } => {
            let mut session = Session::open(validator, config)?;
            let descriptor = session.registry.remove(id)?;
            session.save()?;
            let report = RemovalReport {
                id: id.get(),
                libpath: descriptor.library_path().display().to_string(),
                symbolname: descriptor.symbol_name().to_owned(),
            };
            emit(stdout, format, &report)?;
            Ok(ExitCode::SUCCESS)
        }
        PluginCommand::Edit {
            id,
            library_path,
            symbol_name,
        } => {
            let mut session = Session::open(validator, config)?;
            session.registry.edit(id, library_path, symbol_name)?;
            session.settle();
            session.save()?;
            emit(stdout, format, &session.report(id)?)?;
            Ok(ExitCode::SUCCESS)
        }
        PluginCommand::Show { id } => {
            let mut session = Session::open(validator, config)?;
            let report = session.detailed_report(id, None)?;
            emit(stdout, format, &report)?;
            Ok(ExitCode::SUCCESS)
        }
        PluginCommand::Set { id, name, value } => {
            let mut session = Session::open(validator, config)?;
            let report = session.detailed_report(id, Some((name.as_str(), value.as_str())))?;
            emit(stdout, format, &report)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn check<W: Write>(
    validator: &dyn LibraryValidator,
    library_path: &Path,
    symbol_name: String,
    format: ResolvedOutputFormat,
    stdout: &mut W,
) -> Result<ExitCode, AppError> {
    let outcome = validator.validate(library_path, &symbol_name);
    let report = CheckReport::new(library_path.display().to_string(), symbol_name, &outcome);
    emit(stdout, format, &report)?;
    Ok(if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Registry loaded from the configured store.
struct Session {
    registry: PluginRegistry,
    store: RegistryStore,
    settle_timeout: Duration,
}

impl Session {
    fn open(validator: Arc<dyn LibraryValidator>, config: &Config) -> Result<Self, AppError> {
        let mut registry = PluginRegistry::new(validator, config.missing_validator());
        let store = RegistryStore::new(config.registry_path());
        let defaults = default_plugins(config.plugin_dir().as_std_path());
        match registry.load(&store, &defaults) {
            Ok(_) => {}
            Err(
                error @ (PluginError::StoreFormat { .. }
                | PluginError::UnsupportedStoreVersion { .. }),
            ) => {
                warn!(
                    target: COMMAND_TARGET,
                    path = %store.path().display(),
                    %error,
                    "ignoring unreadable plugin list; using defaults"
                );
                for entry in &defaults {
                    registry.add(entry.library_path(), entry.symbol_name())?;
                }
            }
            Err(other) => return Err(other.into()),
        }
        let mut session = Self {
            registry,
            store,
            settle_timeout: config.validation_timeout().saturating_add(SETTLE_MARGIN),
        };
        session.settle();
        Ok(session)
    }

    fn settle(&mut self) {
        if !self.registry.wait_idle(self.settle_timeout) {
            warn!(
                target: COMMAND_TARGET,
                timeout = ?self.settle_timeout,
                "plugins still validating; reporting current state"
            );
        }
    }

    fn report(&self, id: PluginId) -> Result<PluginReport, AppError> {
        self.registry
            .get(id)
            .map(PluginReport::from_loader)
            .ok_or(AppError::Plugin(PluginError::UnknownPlugin { id }))
    }

    /// Reports a loaded plugin with its settings, first applying `update`
    /// as a `(name, value text)` pair when given.
    fn detailed_report(
        &mut self,
        id: PluginId,
        update: Option<(&str, &str)>,
    ) -> Result<PluginReport, AppError> {
        let loader = self
            .registry
            .get_mut(id)
            .ok_or(PluginError::UnknownPlugin { id })?;
        let summary = PluginReport::from_loader(loader);
        let plugin = loader.plugin_mut().ok_or(PluginError::NotLoaded { id })?;
        if let Some((name, text)) = update {
            apply_setting(plugin, name, text)?;
        }
        Ok(summary.with_settings(&plugin.settings()))
    }

    fn save(&self) -> Result<(), AppError> {
        self.registry.save_to(&self.store)?;
        Ok(())
    }
}

/// Parses `text` as the kind the setting currently has and assigns it.
fn apply_setting(plugin: &mut LoadedPlugin, name: &str, text: &str) -> Result<(), PluginError> {
    let rejected = || PluginError::SettingRejected {
        name: name.to_owned(),
    };
    let kind = plugin
        .settings()
        .iter()
        .find(|setting| setting.name() == name)
        .map(|setting| setting.value().kind())
        .ok_or_else(rejected)?;
    let value = SettingValue::parse(kind, text).ok_or_else(rejected)?;
    plugin.set_setting(name, &value)?;
    debug!(target: COMMAND_TARGET, setting = name, %value, "setting applied");
    Ok(())
}
