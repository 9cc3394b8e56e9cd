//! Layering behaviour of [`Config`]: defaults, files, environment and flags.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use plotline_config::{
    Config, LogFormat, MissingValidatorPolicy, default_log_filter, default_registry_path,
    default_validation_timeout,
};
use rstest::{fixture, rstest};
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Serialises environment access and restores overridden variables on drop.
struct EnvScope {
    previous: Vec<(&'static str, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvScope {
    fn new() -> Self {
        let guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Self {
            previous: Vec::new(),
            _guard: guard,
        }
    }

    fn set(&mut self, key: &'static str, value: impl AsRef<OsStr>) {
        self.previous.push((key, std::env::var_os(key)));
        // Environment mutation is unsafe under edition 2024; the mutex keeps
        // the tests in this binary from racing each other.
        unsafe { std::env::set_var(key, value) };
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        while let Some((key, value)) = self.previous.pop() {
            match value {
                Some(previous) => unsafe { std::env::set_var(key, previous) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

#[fixture]
fn env() -> EnvScope {
    EnvScope::new()
}

fn args(extra: &[&str]) -> Vec<OsString> {
    std::iter::once("plotline")
        .chain(extra.iter().copied())
        .map(OsString::from)
        .collect()
}

fn load(extra: &[&str]) -> Config {
    match Config::load_from_iter(args(extra)) {
        Ok(config) => config,
        Err(error) => panic!("configuration failed to load: {error}"),
    }
}

#[rstest]
fn defaults_apply_without_overrides(#[from(env)] _env: EnvScope) {
    let config = load(&[]);
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), LogFormat::Compact);
    assert_eq!(config.validation_timeout(), default_validation_timeout());
    assert_eq!(config.missing_validator(), MissingValidatorPolicy::Reject);
    assert_eq!(config.registry_path(), default_registry_path());
}

#[rstest]
fn environment_overrides_defaults(mut env: EnvScope) {
    env.set("PLOTLINE_VALIDATION_TIMEOUT_MS", "750");
    env.set("PLOTLINE_MISSING_VALIDATOR", "load_unverified");
    let config = load(&[]);
    assert_eq!(config.validation_timeout(), Duration::from_millis(750));
    assert_eq!(
        config.missing_validator(),
        MissingValidatorPolicy::LoadUnverified
    );
}

#[rstest]
fn flags_override_environment(mut env: EnvScope) {
    env.set("PLOTLINE_LOG_FILTER", "warn");
    let config = load(&["--log-filter", "debug", "--log-format", "json"]);
    assert_eq!(config.log_filter(), "debug");
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[rstest]
fn configuration_file_supplies_paths(#[from(env)] _env: EnvScope) {
    let dir = TempDir::new().expect("create temp dir");
    let file = dir.path().join("plotline.toml");
    fs::write(
        &file,
        "registry_path = \"/srv/plotline/plugins.json\"\nplugin_dir = \"/srv/plotline/plugins\"\n",
    )
    .expect("write configuration file");

    let path = file.to_str().expect("temp path is UTF-8");
    let config = load(&["--config-path", path]);
    assert_eq!(config.registry_path(), "/srv/plotline/plugins.json");
    assert_eq!(config.plugin_dir(), "/srv/plotline/plugins");
}

#[rstest]
fn malformed_policy_fails_to_load(mut env: EnvScope) {
    env.set("PLOTLINE_MISSING_VALIDATOR", "sometimes");
    let result = Config::load_from_iter(args(&[]));
    assert!(result.is_err(), "expected an error, got {result:?}");
}
