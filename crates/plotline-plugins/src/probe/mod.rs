//! Library probing performed inside the disposable validator process.
//!
//! The validator executable is a thin wrapper around [`probe_from_args`]: it
//! turns the verdict into its exit code and never writes to standard output.
//! Any crash inside the probed library takes down only that process.

use std::ffi::OsString;
use std::path::Path;

use crate::library::PluginImage;
use crate::validation::ValidationResult;

/// Number of arguments the validator expects after its program name.
pub const EXPECTED_ARGUMENTS: usize = 2;

/// Loads `path`, resolves `symbol`, creates an instance and releases it.
///
/// A successful probe also calls the instance's `info` entry once; a failure
/// there does not change the verdict.
///
/// # Safety
///
/// The library runs arbitrary code in the calling process. Only call this
/// from a process whose crash is acceptable, such as the validator.
#[must_use]
pub unsafe fn probe_library(path: &Path, symbol: &str) -> ValidationResult {
    // SAFETY: forwarded from the caller.
    match unsafe { PluginImage::open(path, symbol) } {
        Ok(mut image) => {
            drop(image.info());
            ValidationResult::Valid
        }
        Err(result) => result,
    }
}

/// Probes the library named by the validator's command-line arguments.
///
/// `args` excludes the program name. Anything other than exactly a library
/// path and a UTF-8 symbol name yields [`ValidationResult::InvalidArguments`].
///
/// # Safety
///
/// Same contract as [`probe_library`].
#[must_use]
pub unsafe fn probe_from_args<I>(args: I) -> ValidationResult
where
    I: IntoIterator<Item = OsString>,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    let [library_path, symbol] = arguments.as_slice() else {
        return ValidationResult::InvalidArguments;
    };
    let Some(symbol_name) = symbol.to_str() else {
        return ValidationResult::InvalidArguments;
    };
    // SAFETY: forwarded from the caller.
    unsafe { probe_library(Path::new(library_path), symbol_name) }
}
