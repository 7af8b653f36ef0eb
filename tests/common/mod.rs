//! Common test utilities for integration tests
//!
//! Scripted collaborators standing in for the model service and the test
//! runner, shared by the integration test files.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use faultline::domain::models::{DiagnosticRecord, FaultKind};
use faultline::domain::ports::{
    BackendFactory, BackendProfile, GenerationBackend, ResponseHandle, ResponseStatus,
    TestFramework,
};

/// Python module used across the integration tests.
pub const CALC_SOURCE: &str = "\
class Calc:
    def divide(self, a, b):
        return a / b

    def total(self, values):
        result = sum(
            values,
        )
        return result
";

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Backend replaying scripted responses in order; `None` entries and an
/// exhausted script both behave like a failed response.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<VecDeque<Option<String>>>>,
    submissions: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedBackend {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            script: Arc::new(Mutex::new(
                responses.into_iter().map(|r| r.map(Into::into)).collect(),
            )),
            ..Self::default()
        }
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// Messages of every submitted request, in order.
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit(&self, messages: &[String]) -> Option<ResponseHandle> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(messages.to_vec());
        Some(ResponseHandle::new(format!("resp_{n}"), ResponseStatus::Queued))
    }

    async fn poll(&self, _handle: &ResponseHandle) -> Option<String> {
        self.script.lock().unwrap().pop_front().flatten()
    }

    async fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out one scripted backend per profile. Backends of the same profile
/// share a script, so consecutive runs consume it in order.
#[derive(Default)]
pub struct ScriptedFactory {
    backends: HashMap<BackendProfile, ScriptedBackend>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_script<I, S>(mut self, profile: BackendProfile, responses: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        self.backends.insert(profile, ScriptedBackend::new(responses));
        self
    }

    pub fn backend(&self, profile: BackendProfile) -> ScriptedBackend {
        self.backends.get(&profile).cloned().unwrap_or_default()
    }
}

impl BackendFactory for ScriptedFactory {
    type Backend = ScriptedBackend;

    fn create(&self, profile: BackendProfile) -> ScriptedBackend {
        self.backend(profile)
    }
}

/// Test runner replaying canned diagnostics and recording executed files.
#[derive(Default)]
pub struct CannedFramework {
    results: Mutex<VecDeque<Vec<DiagnosticRecord>>>,
    executed: Mutex<Vec<PathBuf>>,
}

impl CannedFramework {
    pub fn new(results: Vec<Vec<DiagnosticRecord>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self) -> Vec<PathBuf> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl TestFramework for CannedFramework {
    fn name(&self) -> &str {
        "canned"
    }

    async fn execute(&self, path: &Path) -> Vec<DiagnosticRecord> {
        self.executed.lock().unwrap().push(path.to_path_buf());
        self.results.lock().unwrap().pop_front().unwrap_or_default()
    }
}

/// A fault raised inside `src/calc.py`.
pub fn fault_in_calc(kind: &str, function: &str, code: &str, lineno: usize) -> DiagnosticRecord {
    DiagnosticRecord {
        kind: FaultKind::named(kind),
        message: "unsupported operand".to_string(),
        path: "src/calc.py".to_string(),
        function: function.to_string(),
        code: code.to_string(),
        lineno,
    }
}
