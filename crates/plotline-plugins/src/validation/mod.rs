//! Validation verdicts shared by the validator executable and the host.
//!
//! [`ValidationResult`] is the closed set of verdicts the validator reports
//! through its process exit code. [`ValidationOutcome`] is the host's view of
//! one validator run, which additionally distinguishes a crashed, hung or
//! unlaunchable validator from a clean verdict.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Verdict of probing one library, with a fixed exit code per variant.
///
/// # Example
///
/// ```
/// use plotline_plugins::ValidationResult;
///
/// let result = ValidationResult::FailedToResolve;
/// assert_eq!(result.code(), 3);
/// assert_eq!(ValidationResult::from_exit_code(3), Some(result));
/// assert_eq!(ValidationResult::from_exit_code(42), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationResult {
    /// Library loaded, symbol resolved and a usable instance was created.
    Valid,
    /// The library file does not exist.
    NotFound,
    /// The dynamic loader rejected the file.
    FailedToLoad,
    /// The factory symbol is not exported by the library.
    FailedToResolve,
    /// The factory produced no instance.
    FailedToCreateInstance,
    /// The validator crashed or timed out, or the instance speaks another ABI.
    InvalidLibrary,
    /// The validator was not given exactly a library path and a symbol name.
    InvalidArguments,
}

impl ValidationResult {
    /// Every verdict, in exit-code order.
    pub const ALL: [Self; 7] = [
        Self::Valid,
        Self::NotFound,
        Self::FailedToLoad,
        Self::FailedToResolve,
        Self::FailedToCreateInstance,
        Self::InvalidLibrary,
        Self::InvalidArguments,
    ];

    /// Returns the process exit code carrying this verdict.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Valid => 0,
            Self::NotFound => 1,
            Self::FailedToLoad => 2,
            Self::FailedToResolve => 3,
            Self::FailedToCreateInstance => 4,
            Self::InvalidLibrary => 5,
            Self::InvalidArguments => 6,
        }
    }

    /// Decodes a process exit code. Unknown codes yield `None`.
    #[must_use]
    pub fn from_exit_code(code: i32) -> Option<Self> {
        let byte = u8::try_from(code).ok()?;
        Self::ALL.into_iter().find(|result| result.code() == byte)
    }

    /// Returns `true` for [`ValidationResult::Valid`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::NotFound => "not_found",
            Self::FailedToLoad => "failed_to_load",
            Self::FailedToResolve => "failed_to_resolve",
            Self::FailedToCreateInstance => "failed_to_create_instance",
            Self::InvalidLibrary => "invalid_library",
            Self::InvalidArguments => "invalid_arguments",
        }
    }

    /// Returns a sentence describing the verdict for end users.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Valid => "the plugin library is valid",
            Self::NotFound => "the plugin library file was not found",
            Self::FailedToLoad => "the plugin library could not be loaded",
            Self::FailedToResolve => "the plugin entry symbol could not be resolved",
            Self::FailedToCreateInstance => "the plugin entry point did not create an instance",
            Self::InvalidLibrary => "the plugin library is invalid or crashed during validation",
            Self::InvalidArguments => "the validator was called with invalid arguments",
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ValidationResult> for std::process::ExitCode {
    fn from(result: ValidationResult) -> Self {
        Self::from(result.code())
    }
}

/// How a validator process ended when it did not report a known verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbnormalExit {
    code: Option<i32>,
    signal: Option<i32>,
}

impl AbnormalExit {
    /// The process exited with a code outside the verdict table.
    #[must_use]
    pub const fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// The process was terminated by a signal.
    #[must_use]
    pub const fn with_signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// The platform reported neither an exit code nor a signal.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            code: None,
            signal: None,
        }
    }

    /// Returns the unrecognised exit code, if any.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        self.code
    }

    /// Returns the terminating signal, if any.
    #[must_use]
    pub const fn signal(&self) -> Option<i32> {
        self.signal
    }
}

impl fmt::Display for AbnormalExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (_, Some(signal)) => write!(f, "terminated by signal {signal}"),
            (Some(code), None) => write!(f, "exited with unexpected code {code}"),
            (None, None) => f.write_str("terminated abnormally"),
        }
    }
}

/// Host-side outcome of one validator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The validator exited with a known verdict.
    Completed(ValidationResult),
    /// The validator terminated abnormally, typically a crash in the library.
    Crashed(AbnormalExit),
    /// The validator exceeded its time budget and was killed.
    TimedOut,
    /// The validator could not be launched or supervised.
    Unavailable {
        /// Description of the launch failure.
        reason: String,
    },
}

impl ValidationOutcome {
    /// Returns the verdict shown to users, or `None` when no validator ran.
    ///
    /// Crashes and timeouts both count as [`ValidationResult::InvalidLibrary`].
    #[must_use]
    pub const fn result(&self) -> Option<ValidationResult> {
        match self {
            Self::Completed(result) => Some(*result),
            Self::Crashed(_) | Self::TimedOut => Some(ValidationResult::InvalidLibrary),
            Self::Unavailable { .. } => None,
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(result) => write!(f, "{result}"),
            Self::Crashed(exit) => write!(f, "validator {exit}"),
            Self::TimedOut => f.write_str("validator timed out"),
            Self::Unavailable { reason } => write!(f, "validator unavailable: {reason}"),
        }
    }
}
