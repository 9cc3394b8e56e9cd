//! Unit tests for the CLI runtime.

use std::ffi::OsString;
use std::fs;
use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use plotline_config::{Config, ConfigError, MissingValidatorPolicy};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

/// Returns a prepared configuration instead of layering sources.
struct StaticLoader(Result<Config, ConfigError>);

impl ConfigLoader for StaticLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        self.0.clone().map_err(AppError::from)
    }
}

/// Scratch directories and a configuration pointing into them.
struct Sandbox {
    dir: TempDir,
    config: Config,
}

impl Sandbox {
    fn registry_file(&self) -> Utf8PathBuf {
        self.config.registry_path()
    }
}

#[fixture]
fn sandbox() -> Sandbox {
    let dir = TempDir::new().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
    let config = Config::default()
        .with_registry_path(root.join("config").join("plugins.json"))
        .with_plugin_dir(root.join("plugins"))
        .with_validator_path(root.join("no-validator"))
        .with_validation_timeout(Duration::from_millis(500))
        .with_missing_validator(MissingValidatorPolicy::Reject);
    Sandbox { dir, config }
}

struct Outcome {
    exit_code: ExitCode,
    stdout: String,
    stderr: String,
}

fn run_cli(loader: &StaticLoader, args: &[&str]) -> Outcome {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let arguments = std::iter::once("plotline")
        .chain(args.iter().copied())
        .map(OsString::from);
    let exit_code = {
        let mut io = IoStreams::with_terminal_status(&mut stdout, &mut stderr, false);
        run_with_loader(arguments, &mut io, loader)
    };
    Outcome {
        exit_code,
        stdout: String::from_utf8(stdout).expect("utf-8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf-8 stderr"),
    }
}

fn run_in(sandbox: &Sandbox, args: &[&str]) -> Outcome {
    run_cli(&StaticLoader(Ok(sandbox.config.clone())), args)
}

fn json(text: &str) -> serde_json::Value {
    serde_json::from_str(text).expect("stdout is json")
}

#[test]
fn help_is_written_to_stdout() {
    let outcome = run_cli(&StaticLoader(Ok(Config::default())), &["--help"]);
    assert_eq!(outcome.exit_code, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("Usage"), "stdout: {}", outcome.stdout);
    assert!(outcome.stderr.is_empty());
}

#[test]
fn unknown_commands_are_usage_errors() {
    let outcome = run_cli(&StaticLoader(Ok(Config::default())), &["frobnicate"]);
    assert_eq!(outcome.exit_code, ExitCode::FAILURE);
    assert!(outcome.stdout.is_empty());
    assert!(
        outcome.stderr.contains("frobnicate"),
        "stderr: {}",
        outcome.stderr
    );
}

#[test]
fn configuration_errors_are_reported() {
    let outcome = run_cli(&StaticLoader(Err(ConfigError::ZeroTimeout)), &["list"]);
    assert_eq!(outcome.exit_code, ExitCode::FAILURE);
    assert!(
        outcome.stderr.contains("validation_timeout_ms must be greater than zero"),
        "stderr: {}",
        outcome.stderr
    );
}

#[rstest]
fn first_listing_shows_the_default_plugin(sandbox: Sandbox) {
    let outcome = run_in(&sandbox, &["--output", "json", "list"]);
    assert_eq!(outcome.exit_code, ExitCode::SUCCESS, "{}", outcome.stderr);

    let listing = json(&outcome.stdout);
    let entries = listing.as_array().expect("array of plugins");
    assert_eq!(entries.len(), 1);
    let default = entries.first().expect("default plugin");
    assert_eq!(default["id"], 1);
    assert_eq!(default["symbolname"], "plotline_create_plugin");
    assert_eq!(default["status"], "failed");
    assert!(
        default["reason"]
            .as_str()
            .is_some_and(|reason| reason.contains("unavailable")),
        "entry: {default}"
    );
    assert!(!sandbox.registry_file().exists(), "listing must not write");
}

#[rstest]
fn add_persists_the_new_plugin(sandbox: Sandbox) {
    let library = sandbox.dir.path().join("libextra.so");
    let library_arg = library.to_str().expect("utf-8 path");
    let outcome = run_in(
        &sandbox,
        &["--output", "json", "add", library_arg, "make_extra"],
    );
    assert_eq!(outcome.exit_code, ExitCode::SUCCESS, "{}", outcome.stderr);
    let added = json(&outcome.stdout);
    assert_eq!(added["id"], 2);
    assert_eq!(added["libpath"], library_arg);
    assert_eq!(added["enabled"], true);

    let stored = fs::read_to_string(sandbox.registry_file()).expect("plugin list written");
    let document = json(&stored);
    assert_eq!(document["plugins"][1]["libpath"], library_arg);
    assert_eq!(document["plugins"][1]["symbolname"], "make_extra");
}

#[rstest]
fn remove_then_list_shows_the_remaining_plugins(sandbox: Sandbox) {
    let outcome = run_in(&sandbox, &["add", "/opt/libextra.so", "make_extra"]);
    assert_eq!(outcome.exit_code, ExitCode::SUCCESS, "{}", outcome.stderr);

    let removal = run_in(&sandbox, &["--output", "human", "remove", "#1"]);
    assert_eq!(removal.exit_code, ExitCode::SUCCESS, "{}", removal.stderr);
    assert!(removal.stdout.starts_with("removed #1 "), "stdout: {}", removal.stdout);

    let listing = run_in(&sandbox, &["--output", "json", "list"]);
    let entries = json(&listing.stdout);
    assert_eq!(entries[0]["libpath"], "/opt/libextra.so");
    assert_eq!(entries.as_array().map(Vec::len), Some(1));
}

#[rstest]
fn edit_rewrites_the_stored_location(sandbox: Sandbox) {
    let outcome = run_in(&sandbox, &["edit", "1", "/opt/libmoved.so", "make_moved"]);
    assert_eq!(outcome.exit_code, ExitCode::SUCCESS, "{}", outcome.stderr);

    let stored = fs::read_to_string(sandbox.registry_file()).expect("plugin list written");
    let document = json(&stored);
    assert_eq!(document["plugins"][0]["libpath"], "/opt/libmoved.so");
    assert_eq!(document["plugins"][0]["symbolname"], "make_moved");
}

#[rstest]
#[case::remove(&["remove", "7"])]
#[case::edit(&["edit", "7", "/opt/libx.so", "make_x"])]
#[case::show(&["show", "7"])]
fn unknown_ids_fail(sandbox: Sandbox, #[case] args: &[&str]) {
    let outcome = run_in(&sandbox, args);
    assert_eq!(outcome.exit_code, ExitCode::FAILURE);
    assert!(
        outcome.stderr.contains("plugin #7 is not registered"),
        "stderr: {}",
        outcome.stderr
    );
}

#[rstest]
fn show_requires_a_loaded_plugin(sandbox: Sandbox) {
    let outcome = run_in(&sandbox, &["show", "1"]);
    assert_eq!(outcome.exit_code, ExitCode::FAILURE);
    assert!(
        outcome.stderr.contains("plugin #1 is not loaded"),
        "stderr: {}",
        outcome.stderr
    );
}

#[rstest]
fn invalid_symbol_is_refused_without_writing(sandbox: Sandbox) {
    let outcome = run_in(&sandbox, &["add", "/opt/libx.so", " "]);
    assert_eq!(outcome.exit_code, ExitCode::FAILURE);
    assert!(
        outcome.stderr.contains("invalid plugin descriptor"),
        "stderr: {}",
        outcome.stderr
    );
    assert!(!sandbox.registry_file().exists());
}

#[rstest]
fn check_fails_when_the_validator_is_missing(sandbox: Sandbox) {
    let outcome = run_in(
        &sandbox,
        &["--output", "json", "check", "/opt/libx.so", "make_x"],
    );
    assert_eq!(outcome.exit_code, ExitCode::FAILURE);
    let report = json(&outcome.stdout);
    assert_eq!(report["valid"], false);
    assert!(report.get("code").is_none());
}

#[test]
fn missing_arguments_report_usage_on_stderr() {
    let outcome = run_cli(&StaticLoader(Ok(Config::default())), &["add", "/opt/libx.so"]);
    assert_eq!(outcome.exit_code, ExitCode::FAILURE);
    assert!(outcome.stdout.is_empty());
    assert!(outcome.stderr.contains("Usage"), "stderr: {}", outcome.stderr);
    assert!(outcome.stderr.contains("SYMBOL"), "stderr: {}", outcome.stderr);
}

#[rstest]
#[case::malformed("<plugins><plugin/></plugins>")]
#[case::newer_version("{\"version\": 9, \"plugins\": []}")]
fn unreadable_plugin_list_falls_back_to_defaults(sandbox: Sandbox, #[case] contents: &str) {
    let file = sandbox.registry_file();
    let parent = file.parent().expect("registry file has a parent");
    fs::create_dir_all(parent).expect("create config dir");
    fs::write(&file, contents).expect("write plugin list");

    let listing = run_in(&sandbox, &["--output", "json", "list"]);
    assert_eq!(listing.exit_code, ExitCode::SUCCESS, "{}", listing.stderr);
    let entries = json(&listing.stdout);
    assert_eq!(entries.as_array().map(Vec::len), Some(1));
    assert_eq!(entries[0]["symbolname"], "plotline_create_plugin");

    let removal = run_in(&sandbox, &["remove", "1"]);
    assert_eq!(removal.exit_code, ExitCode::SUCCESS, "{}", removal.stderr);
    let stored = fs::read_to_string(&file).expect("plugin list rewritten");
    let document = json(&stored);
    assert_eq!(document["version"], 1);
    assert_eq!(document["plugins"].as_array().map(Vec::len), Some(0));
}
