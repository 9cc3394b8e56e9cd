//! Shared validator doubles and crate-level scenarios.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use mockall::mock;

use crate::process::LibraryValidator;
use crate::validation::ValidationOutcome;

mod scenarios;

mock! {
    pub(crate) Validator {}
    impl LibraryValidator for Validator {
        fn validate(&self, library_path: &Path, symbol_name: &str) -> ValidationOutcome;
    }
}

/// Returns the same outcome for every library and records each request.
pub(crate) struct ScriptedValidator {
    outcome: ValidationOutcome,
    calls: Mutex<Vec<ValidationCall>>,
}

/// One recorded `validate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidationCall {
    pub(crate) library_path: PathBuf,
    pub(crate) symbol_name: String,
    pub(crate) thread_name: Option<String>,
}

impl ScriptedValidator {
    pub(crate) fn new(outcome: ValidationOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> Vec<ValidationCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LibraryValidator for ScriptedValidator {
    fn validate(&self, library_path: &Path, symbol_name: &str) -> ValidationOutcome {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ValidationCall {
                library_path: library_path.to_path_buf(),
                symbol_name: symbol_name.to_owned(),
                thread_name: thread::current().name().map(str::to_owned),
            });
        self.outcome.clone()
    }
}

/// Blocks every validation until the test opens the gate.
pub(crate) struct GatedValidator {
    outcome: ValidationOutcome,
    gate: Mutex<Receiver<()>>,
}

impl GatedValidator {
    /// Returns the validator and the sender that releases one run per message.
    /// Dropping the sender releases every run.
    pub(crate) fn new(outcome: ValidationOutcome) -> (Arc<Self>, Sender<()>) {
        let (release, gate) = mpsc::channel();
        let validator = Arc::new(Self {
            outcome,
            gate: Mutex::new(gate),
        });
        (validator, release)
    }
}

impl LibraryValidator for GatedValidator {
    fn validate(&self, _library_path: &Path, _symbol_name: &str) -> ValidationOutcome {
        let gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        drop(gate.recv());
        self.outcome.clone()
    }
}
