//! `#[repr(C)]` types crossing the library boundary and the host-side
//! accessors that turn them back into owned values.

use std::ffi::{CStr, CString, c_char, c_void};
use std::ptr;

use crate::types::{PluginInfo, SettingItem, SettingKind, SettingValue};

/// Current ABI version. Instances reporting any other version are refused.
pub const ABI_VERSION: u32 = 1;

/// Upper bound on the number of settings the host reads from one instance.
pub const MAX_SETTINGS: usize = 1024;

/// Signature of the exported factory symbol.
///
/// The factory writes a heap-allocated [`PluginHandle`] into `out`, or null
/// when it cannot create an instance. Ownership of the handle passes to the
/// caller, who releases it with [`PluginHandle::destroy`].
pub type PluginFactory = unsafe extern "C" fn(out: *mut *mut PluginHandle);

/// Opaque plugin instance as seen by the host.
#[repr(C)]
#[derive(Debug)]
pub struct PluginHandle {
    /// Function table; must outlive the handle.
    pub vtable: *const PluginVTable,
    /// Plugin-owned state passed back to every table entry.
    pub state: *mut c_void,
}

/// Function table behind a [`PluginHandle`].
///
/// Pointers written into out-parameters by `info` and `setting` stay valid
/// until the next call on the same instance.
#[repr(C)]
#[derive(Debug)]
pub struct PluginVTable {
    /// Must equal [`ABI_VERSION`].
    pub abi_version: u32,
    /// Writes the plugin metadata. Returns `false` on failure.
    pub info: unsafe extern "C" fn(state: *mut c_void, out: *mut RawPluginInfo) -> bool,
    /// Snapshots the settings and returns how many there are.
    pub setting_count: unsafe extern "C" fn(state: *mut c_void) -> usize,
    /// Writes the setting at `index` of the latest snapshot.
    pub setting:
        unsafe extern "C" fn(state: *mut c_void, index: usize, out: *mut RawSettingItem) -> bool,
    /// Assigns the named setting. Returns `false` when the plugin refuses it.
    pub set_setting: unsafe extern "C" fn(
        state: *mut c_void,
        name: *const c_char,
        value: *const RawSettingValue,
    ) -> bool,
    /// Releases the instance and the handle itself.
    pub destroy: unsafe extern "C" fn(handle: *mut PluginHandle),
}

/// Borrowed metadata strings written by [`PluginVTable::info`].
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawPluginInfo {
    /// NUL-terminated plugin name.
    pub name: *const c_char,
    /// NUL-terminated version string.
    pub version: *const c_char,
    /// NUL-terminated description, or null.
    pub description: *const c_char,
}

impl RawPluginInfo {
    /// Returns a record with every pointer null.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            name: ptr::null(),
            version: ptr::null(),
            description: ptr::null(),
        }
    }
}

impl Default for RawPluginInfo {
    fn default() -> Self {
        Self::empty()
    }
}

/// Tagged setting value. Only the field selected by `kind` is meaningful.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawSettingValue {
    /// [`SettingKind::code`] of the active field.
    pub kind: u32,
    /// Integer payload.
    pub integer: i64,
    /// Floating-point payload.
    pub double: f64,
    /// NUL-terminated string payload.
    pub string: *const c_char,
}

impl RawSettingValue {
    /// Returns an integer-kind value of zero.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            kind: SettingKind::Integer.code(),
            integer: 0,
            double: 0.0,
            string: ptr::null(),
        }
    }

    /// Borrows `value` into its raw form.
    ///
    /// String values point into `text`, which the caller must keep alive for
    /// as long as the raw value is used; `None` yields a null string pointer.
    #[must_use]
    pub fn from_value(value: &SettingValue, text: Option<&CString>) -> Self {
        let mut raw = Self {
            kind: value.kind().code(),
            ..Self::empty()
        };
        match value {
            SettingValue::Integer(integer) => raw.integer = *integer,
            SettingValue::Double(double) => raw.double = *double,
            SettingValue::String(_) => raw.string = text.map_or(ptr::null(), |s| s.as_ptr()),
        }
        raw
    }

    /// Copies the value out, returning `None` for an unknown kind.
    ///
    /// # Safety
    ///
    /// For string values `string` must be null or a valid NUL-terminated
    /// string.
    #[must_use]
    pub unsafe fn to_owned_value(&self) -> Option<SettingValue> {
        match SettingKind::from_code(self.kind)? {
            SettingKind::Integer => Some(SettingValue::Integer(self.integer)),
            SettingKind::Double => Some(SettingValue::Double(self.double)),
            // SAFETY: forwarded from the caller.
            SettingKind::String => Some(SettingValue::String(unsafe {
                read_c_string(self.string)
            })),
        }
    }
}

impl Default for RawSettingValue {
    fn default() -> Self {
        Self::empty()
    }
}

/// One entry of a settings snapshot.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawSettingItem {
    /// NUL-terminated setting name.
    pub name: *const c_char,
    /// Current value.
    pub value: RawSettingValue,
}

impl RawSettingItem {
    /// Returns an item with a null name.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            name: ptr::null(),
            value: RawSettingValue::empty(),
        }
    }
}

impl Default for RawSettingItem {
    fn default() -> Self {
        Self::empty()
    }
}

impl PluginHandle {
    /// Returns `true` when the handle carries a vtable of the current
    /// [`ABI_VERSION`].
    ///
    /// # Safety
    ///
    /// `vtable` must be null or point to a readable [`PluginVTable`].
    #[must_use]
    pub const unsafe fn is_compatible(&self) -> bool {
        // SAFETY: forwarded from the caller.
        !self.vtable.is_null() && unsafe { (*self.vtable).abi_version } == ABI_VERSION
    }

    const unsafe fn table(&self) -> Option<&PluginVTable> {
        // SAFETY: forwarded from the caller.
        if unsafe { self.is_compatible() } {
            // SAFETY: compatibility implies a non-null, readable vtable.
            Some(unsafe { &*self.vtable })
        } else {
            None
        }
    }

    /// Asks the instance for its metadata.
    ///
    /// Returns `None` when the vtable is incompatible or the plugin reports
    /// failure.
    ///
    /// # Safety
    ///
    /// The handle must come from a plugin factory, must not have been
    /// destroyed, and the library that produced it must still be loaded.
    pub unsafe fn info(&mut self) -> Option<PluginInfo> {
        // SAFETY: forwarded from the caller.
        let table = unsafe { self.table() }?;
        let mut raw_info = RawPluginInfo::empty();
        // SAFETY: `raw_info` is a valid out-parameter for the duration of the call.
        if !unsafe { (table.info)(self.state, &raw mut raw_info) } {
            return None;
        }
        // SAFETY: the plugin keeps the strings alive until the next call.
        let info = unsafe {
            PluginInfo::new(read_c_string(raw_info.name), read_c_string(raw_info.version))
                .with_description(read_c_string(raw_info.description))
        };
        Some(info)
    }

    /// Reads a snapshot of the instance's settings.
    ///
    /// Entries the plugin fails to produce, or whose kind is unknown, are
    /// skipped. At most [`MAX_SETTINGS`] entries are read.
    ///
    /// # Safety
    ///
    /// Same contract as [`PluginHandle::info`].
    pub unsafe fn settings(&mut self) -> Vec<SettingItem> {
        // SAFETY: forwarded from the caller.
        let Some(table) = (unsafe { self.table() }) else {
            return Vec::new();
        };
        let state = self.state;
        // SAFETY: the plugin owns `state`; the count call refreshes its snapshot.
        let count = unsafe { (table.setting_count)(state) }.min(MAX_SETTINGS);
        (0..count)
            .filter_map(|index| {
                let mut raw_item = RawSettingItem::empty();
                // SAFETY: `raw_item` is a valid out-parameter; index is within the snapshot.
                if !unsafe { (table.setting)(state, index, &raw mut raw_item) } {
                    return None;
                }
                // SAFETY: the snapshot strings stay valid until the next call.
                let value = unsafe { raw_item.value.to_owned_value() }?;
                // SAFETY: as above.
                let name = unsafe { read_c_string(raw_item.name) };
                Some(SettingItem::new(name, value))
            })
            .collect()
    }

    /// Assigns a setting by name. Returns `false` when the plugin refuses the
    /// value or the vtable is incompatible.
    ///
    /// # Safety
    ///
    /// Same contract as [`PluginHandle::info`].
    pub unsafe fn set_setting(&mut self, name: &str, value: &SettingValue) -> bool {
        // SAFETY: forwarded from the caller.
        let Some(table) = (unsafe { self.table() }) else {
            return false;
        };
        let c_name = c_string_lossy(name);
        let text = match value {
            SettingValue::String(text) => Some(c_string_lossy(text)),
            SettingValue::Integer(_) | SettingValue::Double(_) => None,
        };
        let raw_value = RawSettingValue::from_value(value, text.as_ref());
        // SAFETY: `c_name`, `text` and `raw_value` outlive the call.
        unsafe { (table.set_setting)(self.state, c_name.as_ptr(), &raw const raw_value) }
    }

    /// Releases a handle through its own vtable.
    ///
    /// Null and incompatible handles are left untouched, since their destroy
    /// entry cannot be trusted.
    ///
    /// # Safety
    ///
    /// `handle` must be null or satisfy the contract of
    /// [`PluginHandle::info`]; it must not be used afterwards.
    pub unsafe fn destroy(handle: *mut Self) {
        // SAFETY: forwarded from the caller.
        let Some(handle_ref) = (unsafe { handle.as_ref() }) else {
            return;
        };
        // SAFETY: forwarded from the caller.
        if let Some(table) = unsafe { handle_ref.table() } {
            let destroy = table.destroy;
            // SAFETY: the handle came from this vtable's factory.
            unsafe { destroy(handle) };
        }
    }
}

/// Builds a C string from `text`, dropping interior NUL bytes.
///
/// ```
/// use plotline_plugin_abi::c_string_lossy;
///
/// assert_eq!(c_string_lossy("a\0b").to_bytes(), b"ab");
/// ```
#[must_use]
pub fn c_string_lossy(text: &str) -> CString {
    let bytes: Vec<u8> = text.bytes().filter(|byte| *byte != 0).collect();
    CString::new(bytes).unwrap_or_default()
}

/// Copies a possibly-null C string, replacing invalid UTF-8.
///
/// # Safety
///
/// `ptr` must be null or a valid NUL-terminated string.
pub(crate) unsafe fn read_c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    unsafe { CStr::from_ptr(ptr) }
        .to_string_lossy()
        .into_owned()
}
