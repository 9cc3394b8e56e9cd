//! Plugin loading and validation for the plotline editor.
//!
//! Plugins are shared libraries exporting a factory that speaks the
//! [`plotline_plugin_abi`] contract. Because a broken library can crash
//! whatever process loads it, the host never opens a library it has not
//! first seen survive a disposable validator process.
//!
//! # Architecture
//!
//! - [`process::ProcessValidator`] runs the `plotline-plugin-validator`
//!   executable, which calls [`probe::probe_library`] and reports a
//!   [`ValidationResult`] through its exit code.
//! - [`PluginLoader`] drives one plugin through
//!   `Disabled -> Validating -> Loaded | Failed`. Validation runs on a
//!   background thread; the result is applied on the owning thread.
//! - [`PluginRegistry`] owns every loader, assigns [`PluginId`]s, drains
//!   completion events and persists the plugin list through a
//!   [`RegistryStore`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use plotline_config::MissingValidatorPolicy;
//! use plotline_plugins::{PluginRegistry, PluginStatus};
//! use plotline_plugins::process::ProcessValidator;
//!
//! let validator = ProcessValidator::new("/opt/plotline/plotline-plugin-validator");
//! let mut registry = PluginRegistry::new(Arc::new(validator), MissingValidatorPolicy::Reject);
//! let id = registry
//!     .add("/opt/plotline/plugins/libsmoothing.so", "plotline_create_plugin")
//!     .expect("descriptor is well formed");
//! registry.wait_idle(Duration::from_secs(5));
//! if let Some(loader) = registry.get(id) {
//!     assert!(matches!(loader.status(), PluginStatus::Loaded | PluginStatus::Failed(_)));
//! }
//! ```

pub mod descriptor;
pub mod error;
pub mod instance;
pub mod library;
pub mod loader;
pub mod probe;
pub mod process;
pub mod registry;
pub mod store;
pub mod validation;

pub use self::descriptor::{PluginDescriptor, PluginId};
pub use self::error::PluginError;
pub use self::instance::LoadedPlugin;
pub use self::library::PluginImage;
pub use self::loader::{LoadFailure, PluginLoader, PluginStatus};
pub use self::process::{LibraryValidator, ProcessValidator};
pub use self::registry::PluginRegistry;
pub use self::store::{RegistryStore, StoredPlugin, default_plugins};
pub use self::validation::{AbnormalExit, ValidationOutcome, ValidationResult};

#[cfg(test)]
mod tests;
