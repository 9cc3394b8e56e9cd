//! Scenarios spanning the registry, its store and the validator process.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use plotline_config::MissingValidatorPolicy;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::ScriptedValidator;
use crate::loader::{LoadFailure, PluginLoader, PluginStatus};
use crate::process::ProcessValidator;
use crate::registry::PluginRegistry;
use crate::store::{RegistryStore, StoredPlugin, default_plugins};
use crate::validation::{ValidationOutcome, ValidationResult};

const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

#[fixture]
fn workspace() -> TempDir {
    TempDir::new().expect("create temp dir")
}

fn rejecting_registry() -> PluginRegistry {
    PluginRegistry::new(
        ScriptedValidator::new(ValidationOutcome::Completed(ValidationResult::NotFound)),
        MissingValidatorPolicy::Reject,
    )
}

#[rstest]
fn first_run_registers_defaults_and_saves_them_on_exit(workspace: TempDir) {
    let store = RegistryStore::new(workspace.path().join("plugins.json"));
    let defaults = default_plugins(&workspace.path().join("plugins"));
    {
        let mut registry = rejecting_registry();
        assert_eq!(registry.load(&store, &defaults).expect("load"), 1);
        registry.persist_to(store.clone());
        assert!(registry.wait_idle(IDLE_TIMEOUT));
    }
    assert_eq!(store.load().expect("reload"), Some(defaults));
}

#[rstest]
fn edits_survive_a_restart(workspace: TempDir) {
    let store = RegistryStore::new(workspace.path().join("plugins.json"));
    {
        let mut registry = rejecting_registry();
        registry.load(&store, &[]).expect("load");
        let kept = registry.add("/opt/libkept.so", "make_kept").expect("add");
        let dropped = registry.add("/opt/libgone.so", "make_gone").expect("add");
        assert!(registry.wait_idle(IDLE_TIMEOUT));
        registry.edit(kept, "/opt/libmoved.so", "make_moved").expect("edit");
        registry.remove(dropped).expect("remove");
        registry.persist_to(store.clone());
    }

    let mut restarted = rejecting_registry();
    assert_eq!(restarted.load(&store, &[]).expect("reload"), 1);
    assert_eq!(
        restarted.stored_plugins(),
        vec![StoredPlugin::new("/opt/libmoved.so", "make_moved")]
    );
    assert!(restarted.iter().all(|loader| loader.descriptor().is_enabled()));
}

#[rstest]
fn missing_validator_keeps_plugins_unloaded(workspace: TempDir) {
    let validator = ProcessValidator::new(workspace.path().join("absent-validator"));
    let mut registry = PluginRegistry::new(Arc::new(validator), MissingValidatorPolicy::Reject);
    let id = registry.add("/opt/libx.so", "make_x").expect("add");
    assert!(registry.wait_idle(IDLE_TIMEOUT));

    let status = registry.get(id).map(PluginLoader::status);
    assert!(
        matches!(
            status,
            Some(PluginStatus::Failed(LoadFailure::ValidatorUnavailable { .. }))
        ),
        "unexpected status: {status:?}"
    );
}

#[cfg(unix)]
#[rstest]
#[case::unresolved("exit 3", PluginStatus::Failed(LoadFailure::Rejected(ValidationResult::FailedToResolve)))]
#[case::bad_arguments("exit 6", PluginStatus::Failed(LoadFailure::Rejected(ValidationResult::InvalidArguments)))]
#[case::library_gone("exit 0", PluginStatus::Failed(LoadFailure::Rejected(ValidationResult::NotFound)))]
fn validator_exit_codes_drive_plugin_status(
    workspace: TempDir,
    #[case] script: &str,
    #[case] expected: PluginStatus,
) {
    let validator = ProcessValidator::new("/bin/sh")
        .with_leading_args(["-c", script, "plotline-plugin-validator"])
        .with_timeout(Duration::from_secs(5));
    let mut registry = PluginRegistry::new(Arc::new(validator), MissingValidatorPolicy::Reject);
    let library: PathBuf = workspace.path().join("libvanishing.so");
    let id = registry.add(library, "make_x").expect("add");
    assert!(registry.wait_idle(IDLE_TIMEOUT));
    assert_eq!(registry.get(id).map(PluginLoader::status), Some(expected));
}

#[cfg(unix)]
#[rstest]
fn hung_validator_is_abandoned(workspace: TempDir) {
    let validator = ProcessValidator::new("/bin/sh")
        .with_leading_args(["-c", "exec sleep 30", "plotline-plugin-validator"])
        .with_timeout(Duration::from_millis(200));
    let mut registry = PluginRegistry::new(Arc::new(validator), MissingValidatorPolicy::Reject);
    let id = registry
        .add(workspace.path().join("libslow.so"), "make_slow")
        .expect("add");
    assert!(registry.wait_idle(IDLE_TIMEOUT));
    assert_eq!(
        registry.get(id).map(PluginLoader::status),
        Some(PluginStatus::Failed(LoadFailure::ValidatorTimedOut))
    );
}
