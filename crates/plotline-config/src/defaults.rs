use std::env;
use std::time::Duration;

use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::policy::MissingValidatorPolicy;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default wall-clock budget for one validator run, in milliseconds.
pub const DEFAULT_VALIDATION_TIMEOUT_MS: u64 = 2_000;

/// File name of the validator executable, without platform suffix.
pub const VALIDATOR_BINARY_NAME: &str = "plotline-plugin-validator";

/// Name of the application directory below the user configuration directory.
pub const APPLICATION_DIR: &str = "plotline";

/// File name of the persisted plugin list.
pub const REGISTRY_FILE_NAME: &str = "plugins.json";

/// Directory, relative to the executable, holding the bundled plugins.
pub const PLUGIN_DIR_NAME: &str = "plugins";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default validation timeout in milliseconds.
#[must_use]
pub const fn default_validation_timeout_ms() -> u64 {
    DEFAULT_VALIDATION_TIMEOUT_MS
}

/// Default validation timeout.
#[must_use]
pub const fn default_validation_timeout() -> Duration {
    Duration::from_millis(DEFAULT_VALIDATION_TIMEOUT_MS)
}

/// Default handling of an unavailable validator.
#[must_use]
pub const fn default_missing_validator() -> MissingValidatorPolicy {
    MissingValidatorPolicy::Reject
}

/// Location of the persisted plugin list: `<config dir>/plotline/plugins.json`.
///
/// Falls back to the temporary directory when the platform reports no
/// configuration directory.
#[must_use]
pub fn default_registry_path() -> Utf8PathBuf {
    let mut base = dirs::config_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(fallback_base_directory);
    base.push(APPLICATION_DIR);
    base.push(REGISTRY_FILE_NAME);
    base
}

/// Directory holding the bundled plugins: `<exe dir>/plugins`.
#[must_use]
pub fn default_plugin_dir() -> Utf8PathBuf {
    executable_directory().map_or_else(
        || Utf8PathBuf::from(PLUGIN_DIR_NAME),
        |dir| dir.join(PLUGIN_DIR_NAME),
    )
}

/// Validator executable installed next to the running binary.
#[must_use]
pub fn default_validator_path() -> Utf8PathBuf {
    let file_name = format!("{VALIDATOR_BINARY_NAME}{}", env::consts::EXE_SUFFIX);
    executable_directory().map_or_else(|| Utf8PathBuf::from(&file_name), |dir| dir.join(&file_name))
}

/// Directory containing the running executable, when it is valid UTF-8.
#[must_use]
pub fn executable_directory() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?.to_path_buf();
    Utf8PathBuf::from_path_buf(parent).ok()
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}
