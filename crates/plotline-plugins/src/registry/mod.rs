//! Registry of plugin loaders.
//!
//! The [`PluginRegistry`] is the only owner of [`PluginLoader`]s. It assigns
//! identifiers, starts validation when plugins are added or re-enabled, and
//! applies validation events on the thread that owns it. Validation threads
//! never touch a loader: they only send events over the registry's channel.
//!
//! A registry attached to a [`RegistryStore`] writes the plugin list back when
//! it is dropped.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use plotline_config::MissingValidatorPolicy;
use tracing::{debug, error, info, warn};

use crate::descriptor::{PluginDescriptor, PluginId};
use crate::error::PluginError;
use crate::loader::{PluginLoader, ValidationEvent};
use crate::process::LibraryValidator;
use crate::store::{RegistryStore, StoredPlugin};

/// Tracing target for registry operations.
const REGISTRY_TARGET: &str = "plotline_plugins::registry";

/// Owns every plugin loader and the channel their validations report on.
///
/// The registry is neither `Send` nor `Sync`; loaded instances stay on the
/// thread that created the registry.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use plotline_config::MissingValidatorPolicy;
/// use plotline_plugins::{
///     LibraryValidator, LoadFailure, PluginRegistry, PluginStatus, ValidationOutcome,
///     ValidationResult,
/// };
///
/// struct Missing;
///
/// impl LibraryValidator for Missing {
///     fn validate(&self, _library_path: &Path, _symbol_name: &str) -> ValidationOutcome {
///         ValidationOutcome::Completed(ValidationResult::NotFound)
///     }
/// }
///
/// let mut registry = PluginRegistry::new(Arc::new(Missing), MissingValidatorPolicy::Reject);
/// let id = registry.add("/nowhere/libx.so", "make_x").expect("well formed");
/// assert!(registry.wait_idle(Duration::from_secs(5)));
/// let status = registry.get(id).map(|loader| loader.status());
/// assert_eq!(
///     status,
///     Some(PluginStatus::Failed(LoadFailure::Rejected(ValidationResult::NotFound)))
/// );
/// ```
pub struct PluginRegistry {
    loaders: Vec<PluginLoader>,
    next_id: u64,
    validator: Arc<dyn LibraryValidator>,
    policy: MissingValidatorPolicy,
    events: Sender<ValidationEvent>,
    completions: Receiver<ValidationEvent>,
    store: Option<RegistryStore>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("loaders", &self.loaders)
            .field("next_id", &self.next_id)
            .field("policy", &self.policy)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl PluginRegistry {
    /// Creates an empty registry validating through `validator`.
    #[must_use]
    pub fn new(validator: Arc<dyn LibraryValidator>, policy: MissingValidatorPolicy) -> Self {
        let (events, completions) = mpsc::channel();
        Self {
            loaders: Vec::new(),
            next_id: 1,
            validator,
            policy,
            events,
            completions,
            store: None,
        }
    }

    /// Registers a plugin and starts validating it.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidDescriptor`] for an empty path or symbol
    /// and [`PluginError::WorkerSpawn`] when validation cannot start; in both
    /// cases nothing is registered.
    pub fn add(
        &mut self,
        library_path: impl Into<PathBuf>,
        symbol_name: impl Into<String>,
    ) -> Result<PluginId, PluginError> {
        let descriptor = PluginDescriptor::new(library_path, symbol_name);
        descriptor.validate()?;

        let id = PluginId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let mut loader = PluginLoader::new(
            id,
            descriptor,
            Arc::clone(&self.validator),
            self.policy,
            self.events.clone(),
        );
        loader.set_enabled(true)?;
        info!(
            target: REGISTRY_TARGET,
            %id,
            library = %loader.descriptor().library_path().display(),
            "plugin added"
        );
        self.loaders.push(loader);
        Ok(id)
    }

    /// Unloads and unregisters a plugin, returning its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownPlugin`] when `id` is not registered.
    pub fn remove(&mut self, id: PluginId) -> Result<PluginDescriptor, PluginError> {
        let index = self
            .loaders
            .iter()
            .position(|loader| loader.id() == id)
            .ok_or(PluginError::UnknownPlugin { id })?;
        let mut loader = self.loaders.remove(index);
        loader.set_enabled(false)?;
        info!(target: REGISTRY_TARGET, %id, "plugin removed");
        Ok(loader.into_descriptor())
    }

    /// Points a plugin at a new library and symbol, then re-validates it.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownPlugin`] for an unregistered `id`,
    /// [`PluginError::ValidationInProgress`] while the plugin is being
    /// validated, [`PluginError::InvalidDescriptor`] for an empty path or
    /// symbol, and [`PluginError::WorkerSpawn`] when validation cannot start.
    pub fn edit(
        &mut self,
        id: PluginId,
        library_path: impl Into<PathBuf>,
        symbol_name: impl Into<String>,
    ) -> Result<(), PluginError> {
        let replacement = PluginDescriptor::new(library_path, symbol_name);
        let loader = self.loader_mut(id)?;
        loader.ensure_idle("library")?;
        replacement.validate()?;

        loader.set_enabled(false)?;
        loader.set_library_path(replacement.library_path().to_path_buf())?;
        loader.set_symbol_name(replacement.symbol_name().to_owned())?;
        loader.set_enabled(true)?;
        info!(target: REGISTRY_TARGET, %id, "plugin edited");
        Ok(())
    }

    /// Enables or disables a plugin. Repeating the current value is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownPlugin`] for an unregistered `id` and
    /// [`PluginError::WorkerSpawn`] when validation cannot start.
    pub fn set_enabled(&mut self, id: PluginId, enabled: bool) -> Result<(), PluginError> {
        self.loader_mut(id)?.set_enabled(enabled)
    }

    /// Looks up a loader.
    #[must_use]
    pub fn get(&self, id: PluginId) -> Option<&PluginLoader> {
        self.loaders.iter().find(|loader| loader.id() == id)
    }

    /// Looks up a loader mutably, e.g. to change settings of its instance.
    #[must_use]
    pub fn get_mut(&mut self, id: PluginId) -> Option<&mut PluginLoader> {
        self.loaders.iter_mut().find(|loader| loader.id() == id)
    }

    /// Iterates over the loaders in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PluginLoader> {
        self.loaders.iter()
    }

    /// Returns the number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    /// Returns `true` when no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Returns `true` while any plugin is being validated.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.loaders.iter().any(PluginLoader::is_validating)
    }

    /// Applies every validation event received so far without blocking.
    ///
    /// Returns the number of events that changed a plugin's state.
    pub fn process_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.completions.try_recv() {
            if self.dispatch(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Blocks until no plugin is being validated or `timeout` passes.
    ///
    /// Returns `true` when the registry became idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            self.process_events();
            if !self.is_busy() {
                return true;
            }
            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return false;
            }
            match self.completions.recv_timeout(remaining) {
                Ok(event) => {
                    self.dispatch(event);
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    return !self.is_busy();
                }
            }
        }
    }

    /// Registers the stored plugins, or `defaults` when none are stored.
    ///
    /// Defaults apply when the list is absent or empty. Entries that cannot
    /// name a plugin are skipped with a warning. Returns the number of
    /// plugins registered.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the list exists but cannot be read,
    /// and [`PluginError::WorkerSpawn`] when validation cannot start.
    pub fn load(
        &mut self,
        store: &RegistryStore,
        defaults: &[StoredPlugin],
    ) -> Result<usize, PluginError> {
        let entries = match store.load()? {
            Some(stored) if !stored.is_empty() => stored,
            Some(_) | None => {
                info!(
                    target: REGISTRY_TARGET,
                    path = %store.path().display(),
                    "no stored plugins; using defaults"
                );
                defaults.to_vec()
            }
        };

        let mut added = 0;
        for entry in entries {
            match self.add(entry.library_path(), entry.symbol_name()) {
                Ok(_) => added += 1,
                Err(PluginError::InvalidDescriptor { message }) => warn!(
                    target: REGISTRY_TARGET,
                    path = %store.path().display(),
                    %message,
                    "skipping stored plugin"
                ),
                Err(other) => return Err(other),
            }
        }
        Ok(added)
    }

    /// Returns the persistable form of every registered plugin.
    #[must_use]
    pub fn stored_plugins(&self) -> Vec<StoredPlugin> {
        self.loaders
            .iter()
            .map(|loader| StoredPlugin::from(loader.descriptor()))
            .collect()
    }

    /// Writes the plugin list to `store` now.
    ///
    /// # Errors
    ///
    /// Returns the store's error when writing fails.
    pub fn save_to(&self, store: &RegistryStore) -> Result<(), PluginError> {
        store.save(&self.stored_plugins())
    }

    /// Writes the plugin list to `store` when the registry is dropped.
    pub fn persist_to(&mut self, store: RegistryStore) {
        self.store = Some(store);
    }

    fn loader_mut(&mut self, id: PluginId) -> Result<&mut PluginLoader, PluginError> {
        self.get_mut(id).ok_or(PluginError::UnknownPlugin { id })
    }

    fn dispatch(&mut self, event: ValidationEvent) -> bool {
        let id = event.id;
        match self.get_mut(id) {
            Some(loader) => loader.complete(event),
            None => {
                debug!(target: REGISTRY_TARGET, %id, "dropping event for removed plugin");
                false
            }
        }
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        let Some(store) = self.store.take() else {
            return;
        };
        if let Err(err) = self.save_to(&store) {
            error!(
                target: REGISTRY_TARGET,
                path = %store.path().display(),
                error = %err,
                "failed to persist plugin list"
            );
        }
    }
}
