//! Plugin library used by the plotline integration tests.
//!
//! The cdylib exports one well-behaved factory and several that misbehave in
//! the ways the validator must contain:
//!
//! | Symbol | Behaviour |
//! |--------|-----------|
//! | `plotline_create_plugin` | a working plugin with settings |
//! | `plotline_null_plugin` | writes a null instance |
//! | `plotline_abort_plugin` | aborts the process |
//! | `plotline_hang_plugin` | never returns in a reasonable time |
//! | `plotline_panicking_info_plugin` | panics whenever asked for its info |

use std::ptr;
use std::thread;
use std::time::Duration;

use plotline_plugin_abi::export::Plugin;
use plotline_plugin_abi::{PluginHandle, PluginInfo, SettingItem, SettingValue, export_plugin};

/// Name reported by the well-behaved plugin.
pub const FIXTURE_NAME: &str = "fixture-smoothing";

/// Version reported by the well-behaved plugin.
pub const FIXTURE_VERSION: &str = "1.2.0";

/// How long the hanging factory sleeps.
pub const HANG_DURATION: Duration = Duration::from_secs(30);

/// Moving-average filter with three adjustable settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Smoothing {
    window: i64,
    weight: f64,
    label: String,
}

impl Default for Smoothing {
    fn default() -> Self {
        Self {
            window: 5,
            weight: 0.5,
            label: String::from("smoothed"),
        }
    }
}

impl Plugin for Smoothing {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(FIXTURE_NAME, FIXTURE_VERSION)
            .with_description("moving average over a sliding window")
    }

    fn settings(&self) -> Vec<SettingItem> {
        vec![
            SettingItem::new("window", SettingValue::Integer(self.window)),
            SettingItem::new("weight", SettingValue::Double(self.weight)),
            SettingItem::new("label", SettingValue::String(self.label.clone())),
        ]
    }

    fn set_setting(&mut self, name: &str, value: SettingValue) -> bool {
        match (name, value) {
            ("window", SettingValue::Integer(window)) if window > 0 => {
                self.window = window;
                true
            }
            ("weight", SettingValue::Double(weight)) if (0.0..=1.0).contains(&weight) => {
                self.weight = weight;
                true
            }
            ("label", SettingValue::String(label)) => {
                self.label = label;
                true
            }
            _ => false,
        }
    }
}

/// Plugin whose metadata accessor always panics.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanickingInfo;

impl Plugin for PanickingInfo {
    fn info(&self) -> PluginInfo {
        panic!("metadata unavailable");
    }
}

export_plugin!(plotline_create_plugin, Smoothing::default());
export_plugin!(plotline_panicking_info_plugin, PanickingInfo);

/// Factory that reports success without producing an instance.
///
/// # Safety
///
/// `out` must be null or valid for a pointer-sized write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn plotline_null_plugin(out: *mut *mut PluginHandle) {
    if !out.is_null() {
        // SAFETY: non-null and writable per the caller's contract.
        unsafe { out.write(ptr::null_mut()) };
    }
}

/// Factory that takes the whole process down.
///
/// # Safety
///
/// Always safe to call; it never returns.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn plotline_abort_plugin(_out: *mut *mut PluginHandle) {
    std::process::abort();
}

/// Factory that stalls far beyond any validation budget.
///
/// # Safety
///
/// `out` must be null or valid for a pointer-sized write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn plotline_hang_plugin(out: *mut *mut PluginHandle) {
    thread::sleep(HANG_DURATION);
    // SAFETY: forwarded from the caller.
    unsafe { plotline_null_plugin(out) };
}
