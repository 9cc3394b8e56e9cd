//! Per-plugin load state machine.
//!
//! A [`PluginLoader`] moves one plugin through
//! `Disabled -> Validating -> Loaded | Failed -> Disabled`. Enabling starts
//! the validator on a dedicated thread, which reports back with a
//! [`ValidationEvent`] over the registry's channel. The owning thread applies
//! the event through [`PluginLoader::complete`]; only then, and only for a
//! [`ValidationResult::Valid`] verdict, is the library opened in-process.
//!
//! Every enable cycle carries a generation number. Disabling, or starting a
//! new cycle, makes events from earlier cycles stale.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use plotline_config::MissingValidatorPolicy;
use tracing::{debug, info, warn};

use crate::descriptor::{PluginDescriptor, PluginId};
use crate::error::PluginError;
use crate::instance::LoadedPlugin;
use crate::library::PluginImage;
use crate::process::LibraryValidator;
use crate::validation::{AbnormalExit, ValidationOutcome, ValidationResult};

/// Tracing target for loader state transitions.
const LOADER_TARGET: &str = "plotline_plugins::loader";

/// Completion report sent by a validation thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidationEvent {
    pub(crate) id: PluginId,
    pub(crate) generation: u64,
    pub(crate) outcome: ValidationOutcome,
}

/// Why an enabled plugin is not loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadFailure {
    /// The validator, or the in-process load after it, returned this verdict.
    Rejected(ValidationResult),
    /// The validator terminated abnormally.
    ValidatorCrashed(AbnormalExit),
    /// The validator exceeded its time budget.
    ValidatorTimedOut,
    /// The validator could not be run and policy forbids unverified loads.
    ValidatorUnavailable {
        /// Description of the launch failure.
        reason: String,
    },
}

impl LoadFailure {
    /// Returns the verdict shown to users, or `None` when no validator ran.
    #[must_use]
    pub const fn result(&self) -> Option<ValidationResult> {
        match self {
            Self::Rejected(result) => Some(*result),
            Self::ValidatorCrashed(_) | Self::ValidatorTimedOut => {
                Some(ValidationResult::InvalidLibrary)
            }
            Self::ValidatorUnavailable { .. } => None,
        }
    }
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(result) => f.write_str(result.description()),
            Self::ValidatorCrashed(exit) => write!(f, "the validator {exit}"),
            Self::ValidatorTimedOut => f.write_str("the validator timed out"),
            Self::ValidatorUnavailable { reason } => {
                write!(f, "the validator is unavailable: {reason}")
            }
        }
    }
}

/// Externally visible loader state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginStatus {
    /// Not enabled; nothing is loaded.
    Disabled,
    /// Enabled and waiting for the validator.
    Validating,
    /// Enabled and loaded.
    Loaded,
    /// Enabled but not loaded.
    Failed(LoadFailure),
}

impl PluginStatus {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Validating => "validating",
            Self::Loaded => "loaded",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(failure) => write!(f, "failed: {failure}"),
            Self::Disabled | Self::Validating | Self::Loaded => f.write_str(self.as_str()),
        }
    }
}

#[derive(Debug)]
enum LoaderState {
    Disabled,
    Validating { generation: u64 },
    Loaded(LoadedPlugin),
    Failed(LoadFailure),
}

/// Drives one plugin through validation and loading.
///
/// Loaders are created and destroyed only by the
/// [`PluginRegistry`](crate::PluginRegistry), which also routes validation
/// events to them.
pub struct PluginLoader {
    id: PluginId,
    descriptor: PluginDescriptor,
    state: LoaderState,
    generation: u64,
    validator: Arc<dyn LibraryValidator>,
    policy: MissingValidatorPolicy,
    events: Sender<ValidationEvent>,
}

impl fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLoader")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PluginLoader {
    pub(crate) fn new(
        id: PluginId,
        descriptor: PluginDescriptor,
        validator: Arc<dyn LibraryValidator>,
        policy: MissingValidatorPolicy,
        events: Sender<ValidationEvent>,
    ) -> Self {
        let mut disabled = descriptor;
        disabled.set_enabled(false);
        Self {
            id,
            descriptor: disabled,
            state: LoaderState::Disabled,
            generation: 0,
            validator,
            policy,
            events,
        }
    }

    /// Returns the plugin identifier.
    #[must_use]
    pub const fn id(&self) -> PluginId {
        self.id
    }

    /// Returns the plugin's library path, symbol and enabled flag.
    #[must_use]
    pub const fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    /// Returns the current state.
    #[must_use]
    pub fn status(&self) -> PluginStatus {
        match &self.state {
            LoaderState::Disabled => PluginStatus::Disabled,
            LoaderState::Validating { .. } => PluginStatus::Validating,
            LoaderState::Loaded(_) => PluginStatus::Loaded,
            LoaderState::Failed(failure) => PluginStatus::Failed(failure.clone()),
        }
    }

    /// Returns `true` while the validator runs.
    #[must_use]
    pub const fn is_validating(&self) -> bool {
        matches!(self.state, LoaderState::Validating { .. })
    }

    /// Returns the loaded instance, if any.
    #[must_use]
    pub const fn plugin(&self) -> Option<&LoadedPlugin> {
        match &self.state {
            LoaderState::Loaded(plugin) => Some(plugin),
            LoaderState::Disabled | LoaderState::Validating { .. } | LoaderState::Failed(_) => {
                None
            }
        }
    }

    /// Returns the loaded instance mutably, if any.
    #[must_use]
    pub const fn plugin_mut(&mut self) -> Option<&mut LoadedPlugin> {
        match &mut self.state {
            LoaderState::Loaded(plugin) => Some(plugin),
            LoaderState::Disabled | LoaderState::Validating { .. } | LoaderState::Failed(_) => {
                None
            }
        }
    }

    /// Enables or disables the plugin. Repeating the current value is a no-op.
    ///
    /// Enabling starts a validation cycle. Disabling unloads the instance and
    /// abandons any validation in flight.
    pub(crate) fn set_enabled(&mut self, enabled: bool) -> Result<(), PluginError> {
        if enabled == self.descriptor.is_enabled() {
            debug!(target: LOADER_TARGET, id = %self.id, enabled, "enabled flag unchanged");
            return Ok(());
        }
        self.descriptor.set_enabled(enabled);
        if enabled {
            self.start_validation()
        } else {
            self.generation = self.generation.wrapping_add(1);
            self.state = LoaderState::Disabled;
            info!(
                target: LOADER_TARGET,
                id = %self.id,
                library = %self.descriptor.library_path().display(),
                "plugin disabled"
            );
            Ok(())
        }
    }

    /// Changes the library path used by the next enable cycle.
    pub(crate) fn set_library_path(&mut self, library_path: PathBuf) -> Result<(), PluginError> {
        self.ensure_idle("library path")?;
        self.descriptor.set_library_path(library_path);
        Ok(())
    }

    /// Changes the factory symbol used by the next enable cycle.
    pub(crate) fn set_symbol_name(&mut self, symbol_name: String) -> Result<(), PluginError> {
        self.ensure_idle("symbol name")?;
        self.descriptor.set_symbol_name(symbol_name);
        Ok(())
    }

    pub(crate) fn into_descriptor(self) -> PluginDescriptor {
        self.descriptor
    }

    pub(crate) fn ensure_idle(&self, field: &str) -> Result<(), PluginError> {
        if self.is_validating() {
            warn!(
                target: LOADER_TARGET,
                id = %self.id,
                field,
                "plugin is being validated; change ignored"
            );
            return Err(PluginError::ValidationInProgress { id: self.id });
        }
        Ok(())
    }

    fn start_validation(&mut self) -> Result<(), PluginError> {
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        self.state = LoaderState::Validating { generation };

        let id = self.id;
        let validator = Arc::clone(&self.validator);
        let events = self.events.clone();
        let library_path = self.descriptor.library_path().to_path_buf();
        let symbol_name = self.descriptor.symbol_name().to_owned();
        info!(
            target: LOADER_TARGET,
            %id,
            library = %library_path.display(),
            symbol = %symbol_name,
            "validating plugin"
        );

        let spawned = thread::Builder::new()
            .name(format!("plugin-validate-{}", id.get()))
            .spawn(move || {
                let outcome = validator.validate(&library_path, &symbol_name);
                // The registry may already be gone; the verdict is then moot.
                drop(events.send(ValidationEvent {
                    id,
                    generation,
                    outcome,
                }));
            });

        match spawned {
            Ok(_) => Ok(()),
            Err(source) => {
                warn!(target: LOADER_TARGET, %id, error = %source, "could not start validation");
                self.state = LoaderState::Failed(LoadFailure::ValidatorUnavailable {
                    reason: source.to_string(),
                });
                Err(PluginError::WorkerSpawn {
                    id,
                    source: Arc::new(source),
                })
            }
        }
    }

    /// Applies a validation verdict. Returns `false` for stale events.
    pub(crate) fn complete(&mut self, event: ValidationEvent) -> bool {
        let LoaderState::Validating { generation } = self.state else {
            debug!(target: LOADER_TARGET, id = %self.id, "ignoring event for idle plugin");
            return false;
        };
        if generation != event.generation {
            debug!(
                target: LOADER_TARGET,
                id = %self.id,
                current = generation,
                stale = event.generation,
                "ignoring stale validation event"
            );
            return false;
        }

        self.state = match event.outcome {
            ValidationOutcome::Completed(ValidationResult::Valid) => self.load_in_process(),
            ValidationOutcome::Completed(result) => LoaderState::Failed(LoadFailure::Rejected(result)),
            ValidationOutcome::Crashed(exit) => {
                LoaderState::Failed(LoadFailure::ValidatorCrashed(exit))
            }
            ValidationOutcome::TimedOut => LoaderState::Failed(LoadFailure::ValidatorTimedOut),
            ValidationOutcome::Unavailable { reason } => match self.policy {
                MissingValidatorPolicy::Reject => {
                    LoaderState::Failed(LoadFailure::ValidatorUnavailable { reason })
                }
                MissingValidatorPolicy::LoadUnverified => {
                    warn!(
                        target: LOADER_TARGET,
                        id = %self.id,
                        %reason,
                        "validator unavailable; loading plugin without validation"
                    );
                    self.load_in_process()
                }
            },
        };
        self.log_settled();
        true
    }

    fn load_in_process(&self) -> LoaderState {
        let library_path = self.descriptor.library_path();
        // SAFETY: the library passed the out-of-process validator, or policy
        // explicitly allows loading it unverified.
        match unsafe { PluginImage::open(library_path, self.descriptor.symbol_name()) } {
            Ok(image) => LoaderState::Loaded(LoadedPlugin::from_image(image, library_path)),
            Err(result) => {
                warn!(
                    target: LOADER_TARGET,
                    id = %self.id,
                    library = %library_path.display(),
                    %result,
                    "library changed after validation; refusing to load"
                );
                LoaderState::Failed(LoadFailure::Rejected(result))
            }
        }
    }

    fn log_settled(&self) {
        match &self.state {
            LoaderState::Loaded(plugin) => info!(
                target: LOADER_TARGET,
                id = %self.id,
                name = plugin.info().name(),
                version = plugin.info().version(),
                "plugin loaded"
            ),
            LoaderState::Failed(failure) => warn!(
                target: LOADER_TARGET,
                id = %self.id,
                library = %self.descriptor.library_path().display(),
                %failure,
                "plugin failed to load"
            ),
            LoaderState::Disabled | LoaderState::Validating { .. } => {}
        }
    }
}
