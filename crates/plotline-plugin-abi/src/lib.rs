//! Binary interface shared by the plotline host and its plugin libraries.
//!
//! A plugin is a shared library exporting one factory function with the
//! [`PluginFactory`] signature. The factory writes a [`PluginHandle`] (or
//! null) into its out-parameter. The handle pairs an opaque state pointer with
//! a [`PluginVTable`] tagged by [`ABI_VERSION`], so the host can refuse an
//! instance built against another revision of this contract instead of
//! misreading its function table.
//!
//! Plugin authors do not implement the table by hand: they implement
//! [`export::Plugin`] and let [`export_plugin!`] generate the factory.
//!
//! ```rust
//! use plotline_plugin_abi::export::Plugin;
//! use plotline_plugin_abi::{PluginInfo, SettingItem, SettingValue, export_plugin};
//!
//! #[derive(Default)]
//! struct Smoothing {
//!     window: i64,
//! }
//!
//! impl Plugin for Smoothing {
//!     fn info(&self) -> PluginInfo {
//!         PluginInfo::new("smoothing", "0.3.0").with_description("moving average filter")
//!     }
//!
//!     fn settings(&self) -> Vec<SettingItem> {
//!         vec![SettingItem::new("window", SettingValue::Integer(self.window))]
//!     }
//! }
//!
//! export_plugin!(smoothing_create_plugin, Smoothing::default());
//! ```

pub mod export;
mod raw;
mod types;

pub use self::raw::{
    ABI_VERSION, MAX_SETTINGS, PluginFactory, PluginHandle, PluginVTable, RawPluginInfo,
    RawSettingItem, RawSettingValue, c_string_lossy,
};
pub use self::types::{PluginInfo, SettingItem, SettingKind, SettingValue};

/// Generates an exported plugin factory named `$symbol`.
///
/// The generated function has the [`PluginFactory`] signature, boxes the
/// value produced by `$constructor` as a [`export::Plugin`] trait object and
/// writes the resulting [`PluginHandle`] into the out-parameter. A panic in
/// the constructor writes null instead of unwinding into the host.
#[macro_export]
macro_rules! export_plugin {
    ($symbol:ident, $constructor:expr) => {
        #[doc = concat!("Plugin factory exported as `", stringify!($symbol), "`.")]
        ///
        /// # Safety
        ///
        /// `out` must be null or valid for a pointer-sized write.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $symbol(out: *mut *mut $crate::PluginHandle) {
            // SAFETY: the caller upholds the out-parameter contract.
            unsafe {
                $crate::export::write_factory_output(
                    out,
                    || -> ::std::boxed::Box<dyn $crate::export::Plugin> {
                        ::std::boxed::Box::new($constructor)
                    },
                );
            }
        }
    };
}
