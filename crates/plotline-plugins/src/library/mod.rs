//! In-process plugin image: an opened library and the instance it created.
//!
//! [`PluginImage::open`] performs the load sequence shared by the validator
//! and the host, mapping each failure to the [`ValidationResult`] the
//! validator reports for it. The image destroys its instance through the
//! plugin's own function table before the library is unloaded.

use std::path::Path;
use std::ptr::{self, NonNull};

use libloading::Library;
use plotline_plugin_abi::{PluginFactory, PluginHandle, PluginInfo, SettingItem, SettingValue};
use tracing::debug;

use crate::validation::ValidationResult;

/// Tracing target for library loading.
const LIBRARY_TARGET: &str = "plotline_plugins::library";

/// A live plugin instance together with the library that produced it.
///
/// The image is neither `Send` nor `Sync`: the instance belongs to the thread
/// that created it.
#[derive(Debug)]
pub struct PluginImage {
    handle: NonNull<PluginHandle>,
    library: Option<Library>,
}

impl PluginImage {
    /// Opens `path`, resolves `symbol` and asks the factory for an instance.
    ///
    /// # Errors
    ///
    /// Returns the verdict describing the first step that failed:
    /// [`ValidationResult::NotFound`], [`ValidationResult::FailedToLoad`],
    /// [`ValidationResult::FailedToResolve`],
    /// [`ValidationResult::FailedToCreateInstance`], or
    /// [`ValidationResult::InvalidLibrary`] when the instance speaks another
    /// ABI version.
    ///
    /// # Safety
    ///
    /// Loading a library runs its initialisers, and the factory is trusted to
    /// match [`PluginFactory`]. A misbehaving library can corrupt or abort the
    /// calling process, which is why hosts call this only for libraries that
    /// already passed the out-of-process validator.
    pub unsafe fn open(path: &Path, symbol: &str) -> Result<Self, ValidationResult> {
        if !path.exists() {
            debug!(target: LIBRARY_TARGET, path = %path.display(), "library file missing");
            return Err(ValidationResult::NotFound);
        }

        // SAFETY: forwarded from the caller.
        let library = unsafe { Library::new(path) }.map_err(|error| {
            debug!(target: LIBRARY_TARGET, path = %path.display(), %error, "dynamic loader refused library");
            ValidationResult::FailedToLoad
        })?;

        // SAFETY: the caller vouches that the symbol has the factory signature.
        let factory: PluginFactory = *unsafe { library.get::<PluginFactory>(symbol.as_bytes()) }
            .map_err(|error| {
                debug!(target: LIBRARY_TARGET, symbol, %error, "factory symbol not found");
                ValidationResult::FailedToResolve
            })?;

        let mut out: *mut PluginHandle = ptr::null_mut();
        // SAFETY: `out` is a valid out-parameter; `library` stays loaded.
        unsafe { factory(&raw mut out) };
        let Some(handle) = NonNull::new(out) else {
            debug!(target: LIBRARY_TARGET, symbol, "factory returned no instance");
            return Err(ValidationResult::FailedToCreateInstance);
        };

        // SAFETY: the factory returned a live handle.
        if !unsafe { handle.as_ref().is_compatible() } {
            // The destroy entry of a foreign vtable cannot be trusted, so the
            // instance is leaked rather than released.
            debug!(target: LIBRARY_TARGET, symbol, "instance speaks another ABI version");
            return Err(ValidationResult::InvalidLibrary);
        }

        Ok(Self {
            handle,
            library: Some(library),
        })
    }

    /// Wraps an instance created by code already linked into the host.
    ///
    /// # Safety
    ///
    /// `handle` must be a live, compatible handle that nothing else releases.
    #[must_use]
    pub const unsafe fn from_linked(handle: NonNull<PluginHandle>) -> Self {
        Self {
            handle,
            library: None,
        }
    }

    /// Returns `true` when the instance came from a dynamically loaded library.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        self.library.is_some()
    }

    /// Asks the instance for its metadata; `None` when the plugin fails.
    pub fn info(&mut self) -> Option<PluginInfo> {
        // SAFETY: the handle is live and its library loaded until `self` drops.
        unsafe { self.handle.as_mut().info() }
    }

    /// Reads a snapshot of the instance's settings.
    pub fn settings(&mut self) -> Vec<SettingItem> {
        // SAFETY: as in `info`.
        unsafe { self.handle.as_mut().settings() }
    }

    /// Assigns a setting; returns `false` when the plugin refuses it.
    pub fn set_setting(&mut self, name: &str, value: &SettingValue) -> bool {
        // SAFETY: as in `info`.
        unsafe { self.handle.as_mut().set_setting(name, value) }
    }
}

impl Drop for PluginImage {
    fn drop(&mut self) {
        // SAFETY: the handle is released exactly once, before `library`
        // unloads the code behind its vtable.
        unsafe { PluginHandle::destroy(self.handle.as_ptr()) };
    }
}
