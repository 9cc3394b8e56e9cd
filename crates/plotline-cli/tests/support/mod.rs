//! Helpers shared by the binary integration tests.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Library name of the test plugin crate.
const FIXTURE_LIBRARY: &str = "plotline_fixture_plugin";

/// Locates the fixture plugin's shared library next to the built binaries.
///
/// Cargo builds the cdylib because `plotline-fixture-plugin` is a
/// dev-dependency; it lands either beside the binaries or in `deps/`.
/// Returns `None`, after noting it on stderr, when it cannot be found.
pub fn fixture_library() -> Option<PathBuf> {
    let binary = Path::new(env!("CARGO_BIN_EXE_plotline"));
    let target_dir = binary.parent()?;
    let found = [target_dir.to_path_buf(), target_dir.join("deps")]
        .iter()
        .find_map(|dir| find_library(dir));
    if found.is_none() {
        drop(writeln!(
            io::stderr(),
            "skipping: {DLL_PREFIX}{FIXTURE_LIBRARY}{DLL_SUFFIX} not found under {}",
            target_dir.display()
        ));
    }
    found
}

fn find_library(dir: &Path) -> Option<PathBuf> {
    let stem = format!("{DLL_PREFIX}{FIXTURE_LIBRARY}");
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&stem) && name.ends_with(DLL_SUFFIX))
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}
