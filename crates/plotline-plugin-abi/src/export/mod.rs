//! Plugin-side adapter from a safe Rust trait to the C function table.
//!
//! [`into_handle`] wraps any [`Plugin`] in a [`PluginHandle`] whose vtable
//! forwards to the trait. Every entry point catches panics and reports them
//! as failure, so a misbehaving plugin cannot unwind into the host.

use std::ffi::{CStr, CString, c_char, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use crate::raw::{
    ABI_VERSION, PluginHandle, PluginVTable, RawPluginInfo, RawSettingItem, RawSettingValue,
    c_string_lossy,
};
use crate::types::{PluginInfo, SettingItem, SettingValue};

/// Behaviour a plugin library implements.
pub trait Plugin: Send {
    /// Returns the plugin metadata.
    fn info(&self) -> PluginInfo;

    /// Returns the current settings. Plugins without settings keep the default.
    fn settings(&self) -> Vec<SettingItem> {
        Vec::new()
    }

    /// Assigns a setting; returns `false` when the name or value is refused.
    fn set_setting(&mut self, _name: &str, _value: SettingValue) -> bool {
        false
    }
}

/// Boxes `plugin` behind a freshly allocated [`PluginHandle`].
///
/// The handle is released through its vtable's `destroy` entry.
#[must_use]
pub fn into_handle(plugin: Box<dyn Plugin>) -> *mut PluginHandle {
    let state = Box::into_raw(Box::new(Exported::new(plugin))).cast::<c_void>();
    Box::into_raw(Box::new(PluginHandle {
        vtable: &EXPORTED_VTABLE,
        state,
    }))
}

/// Runs a plugin constructor and writes the resulting handle into `out`.
///
/// A panicking constructor writes null. This is the body of the factories
/// generated by [`export_plugin!`](crate::export_plugin).
///
/// # Safety
///
/// `out` must be null or valid for a pointer-sized write.
pub unsafe fn write_factory_output<F>(out: *mut *mut PluginHandle, make: F)
where
    F: FnOnce() -> Box<dyn Plugin>,
{
    if out.is_null() {
        return;
    }
    let handle = panic::catch_unwind(AssertUnwindSafe(make)).map_or(ptr::null_mut(), into_handle);
    // SAFETY: non-null and writable per the caller's contract.
    unsafe { out.write(handle) };
}

static EXPORTED_VTABLE: PluginVTable = PluginVTable {
    abi_version: ABI_VERSION,
    info: exported_info,
    setting_count: exported_setting_count,
    setting: exported_setting,
    set_setting: exported_set_setting,
    destroy: exported_destroy,
};

struct Exported {
    plugin: Box<dyn Plugin>,
    info: Option<InfoStrings>,
    settings: Vec<ExportedSetting>,
}

impl Exported {
    fn new(plugin: Box<dyn Plugin>) -> Self {
        Self {
            plugin,
            info: None,
            settings: Vec::new(),
        }
    }
}

struct InfoStrings {
    name: CString,
    version: CString,
    description: CString,
}

impl InfoStrings {
    fn raw(&self) -> RawPluginInfo {
        RawPluginInfo {
            name: self.name.as_ptr(),
            version: self.version.as_ptr(),
            description: self.description.as_ptr(),
        }
    }
}

impl From<&PluginInfo> for InfoStrings {
    fn from(info: &PluginInfo) -> Self {
        Self {
            name: c_string_lossy(info.name()),
            version: c_string_lossy(info.version()),
            description: c_string_lossy(info.description()),
        }
    }
}

struct ExportedSetting {
    name: CString,
    value: SettingValue,
    text: Option<CString>,
}

impl ExportedSetting {
    fn new(item: SettingItem) -> Self {
        let (name, value) = item.into_parts();
        let text = match &value {
            SettingValue::String(text) => Some(c_string_lossy(text)),
            SettingValue::Integer(_) | SettingValue::Double(_) => None,
        };
        Self {
            name: c_string_lossy(&name),
            value,
            text,
        }
    }

    fn raw(&self) -> RawSettingItem {
        RawSettingItem {
            name: self.name.as_ptr(),
            value: RawSettingValue::from_value(&self.value, self.text.as_ref()),
        }
    }
}

fn guarded<T>(fallback: T, body: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or(fallback)
}

/// # Safety
///
/// `state` must be null or the state pointer of a handle built by
/// [`into_handle`] that has not been destroyed.
const unsafe fn exported_state<'a>(state: *mut c_void) -> Option<&'a mut Exported> {
    // SAFETY: forwarded from the caller.
    unsafe { state.cast::<Exported>().as_mut() }
}

unsafe extern "C" fn exported_info(state: *mut c_void, out: *mut RawPluginInfo) -> bool {
    guarded(false, || {
        // SAFETY: the host passes back the state of a live handle.
        let Some(exported) = (unsafe { exported_state(state) }) else {
            return false;
        };
        if out.is_null() {
            return false;
        }
        let info = exported.plugin.info();
        let strings = exported.info.insert(InfoStrings::from(&info));
        // SAFETY: `out` is non-null and points to a host-owned record.
        unsafe { out.write(strings.raw()) };
        true
    })
}

unsafe extern "C" fn exported_setting_count(state: *mut c_void) -> usize {
    guarded(0, || {
        // SAFETY: the host passes back the state of a live handle.
        let Some(exported) = (unsafe { exported_state(state) }) else {
            return 0;
        };
        exported.settings = exported
            .plugin
            .settings()
            .into_iter()
            .map(ExportedSetting::new)
            .collect();
        exported.settings.len()
    })
}

unsafe extern "C" fn exported_setting(
    state: *mut c_void,
    index: usize,
    out: *mut RawSettingItem,
) -> bool {
    guarded(false, || {
        // SAFETY: the host passes back the state of a live handle.
        let Some(exported) = (unsafe { exported_state(state) }) else {
            return false;
        };
        let Some(setting) = exported.settings.get(index) else {
            return false;
        };
        if out.is_null() {
            return false;
        }
        // SAFETY: `out` is non-null and points to a host-owned record.
        unsafe { out.write(setting.raw()) };
        true
    })
}

unsafe extern "C" fn exported_set_setting(
    state: *mut c_void,
    name: *const c_char,
    value: *const RawSettingValue,
) -> bool {
    guarded(false, || {
        // SAFETY: the host passes back the state of a live handle.
        let Some(exported) = (unsafe { exported_state(state) }) else {
            return false;
        };
        if name.is_null() {
            return false;
        }
        // SAFETY: the host passes a NUL-terminated name that outlives the call.
        let setting_name = unsafe { CStr::from_ptr(name) }
            .to_string_lossy()
            .into_owned();
        // SAFETY: the host passes null or a valid value record.
        let Some(requested) = (unsafe { value.as_ref() }).and_then(|raw| {
            // SAFETY: string payloads outlive the call.
            unsafe { raw.to_owned_value() }
        }) else {
            return false;
        };
        exported.settings.clear();
        exported.plugin.set_setting(&setting_name, requested)
    })
}

unsafe extern "C" fn exported_destroy(handle: *mut PluginHandle) {
    if handle.is_null() {
        return;
    }
    drop(panic::catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: the handle was allocated by `into_handle` and is released once.
        let boxed = unsafe { Box::from_raw(handle) };
        if !boxed.state.is_null() {
            // SAFETY: the state was allocated by `into_handle`.
            drop(unsafe { Box::from_raw(boxed.state.cast::<Exported>()) });
        }
    })));
}
