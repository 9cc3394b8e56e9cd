//! Unit tests for the validator process client.
//!
//! The tests stand a POSIX shell in for the validator executable: the shell
//! script receives the library path and symbol name as `$1` and `$2` and
//! exits the way a real validator would.

use std::path::Path;
use std::time::{Duration, Instant};

use rstest::rstest;

use super::*;

fn shell(script: &str) -> ProcessValidator {
    ProcessValidator::new("/bin/sh")
        .with_leading_args(["-c", script, "plotline-plugin-validator"])
        .with_timeout(Duration::from_secs(5))
}

fn run(validator: &ProcessValidator) -> ValidationOutcome {
    validator.validate(Path::new("/opt/plugins/libtable.so"), "plotline_create_plugin")
}

#[test]
fn defaults_use_configured_timeout() {
    let validator = ProcessValidator::new("/usr/libexec/plotline-plugin-validator");
    assert_eq!(validator.timeout(), default_validation_timeout());
    assert_eq!(
        validator.program(),
        Path::new("/usr/libexec/plotline-plugin-validator")
    );
}

#[test]
fn from_config_honours_timeout_and_path() {
    let config = Config::default()
        .with_validator_path("/srv/bin/check")
        .with_validation_timeout(Duration::from_millis(300));
    let validator = ProcessValidator::from_config(&config);
    assert_eq!(validator.program(), Path::new("/srv/bin/check"));
    assert_eq!(validator.timeout(), Duration::from_millis(300));
}

#[test]
fn unlaunchable_validator_is_unavailable() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let validator = ProcessValidator::new(dir.path().join("no-such-validator"));
    let outcome = run(&validator);
    assert!(
        matches!(outcome, ValidationOutcome::Unavailable { .. }),
        "unexpected outcome: {outcome:?}"
    );
    assert_eq!(outcome.result(), None);
}

#[cfg(unix)]
#[rstest]
#[case::valid("exit 0", ValidationResult::Valid)]
#[case::not_found("exit 1", ValidationResult::NotFound)]
#[case::unresolved("exit 3", ValidationResult::FailedToResolve)]
#[case::null_instance("exit 4", ValidationResult::FailedToCreateInstance)]
#[case::bad_arguments("exit 6", ValidationResult::InvalidArguments)]
fn known_exit_codes_complete(#[case] script: &str, #[case] expected: ValidationResult) {
    assert_eq!(
        run(&shell(script)),
        ValidationOutcome::Completed(expected)
    );
}

#[cfg(unix)]
#[test]
fn library_and_symbol_are_the_final_arguments() {
    let script = r#"[ "$#" -eq 2 ] && [ "$1" = /opt/plugins/libtable.so ] && [ "$2" = plotline_create_plugin ] || exit 6"#;
    assert_eq!(
        run(&shell(script)),
        ValidationOutcome::Completed(ValidationResult::Valid)
    );
}

#[cfg(unix)]
#[test]
fn unknown_exit_code_is_a_crash() {
    assert_eq!(
        run(&shell("exit 42")),
        ValidationOutcome::Crashed(AbnormalExit::with_code(42))
    );
}

#[cfg(unix)]
#[test]
fn signal_termination_is_a_crash() {
    let outcome = run(&shell("kill -SEGV $$"));
    assert_eq!(outcome, ValidationOutcome::Crashed(AbnormalExit::with_signal(11)));
    assert_eq!(outcome.result(), Some(ValidationResult::InvalidLibrary));
}

#[cfg(unix)]
#[test]
fn stderr_noise_does_not_change_the_verdict() {
    let outcome = run(&shell("echo 'loader warning' >&2; exit 2"));
    assert_eq!(
        outcome,
        ValidationOutcome::Completed(ValidationResult::FailedToLoad)
    );
}

#[cfg(unix)]
#[test]
fn background_process_holding_stderr_does_not_extend_the_wait() {
    let validator = shell("sleep 5 & exit 0").with_timeout(Duration::from_millis(300));
    let start = Instant::now();
    let outcome = run(&validator);
    assert_eq!(
        outcome,
        ValidationOutcome::Completed(ValidationResult::Valid)
    );
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "validate waited {:?} for an inherited stderr pipe",
        start.elapsed()
    );
}

#[cfg(unix)]
#[test]
fn hanging_validator_times_out_and_is_killed() {
    let validator = shell("exec sleep 30").with_timeout(Duration::from_millis(200));
    let start = Instant::now();
    let outcome = run(&validator);
    assert_eq!(outcome, ValidationOutcome::TimedOut);
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "timeout not enforced: {:?}",
        start.elapsed()
    );
}

#[test]
fn sibling_lookup_only_returns_the_installed_validator() {
    let Some(validator) = ProcessValidator::locate_sibling() else {
        return;
    };
    assert!(validator.program().is_file());
    assert_eq!(
        validator.program().file_stem().and_then(|stem| stem.to_str()),
        Some(plotline_config::VALIDATOR_BINARY_NAME)
    );
}
