//! pytest validation collaborator
//!
//! Runs a generated test file with the `pytest-json-report` plugin and turns
//! the report into diagnostics. pytest's own output is discarded; only the
//! JSON report is read.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::errors::FrameworkError;
use crate::domain::models::{DiagnosticRecord, FrameworkConfig};
use crate::domain::ports::TestFramework;
use crate::services::DiagnosticNormalizer;

/// Wall-clock budget of a whole run, in multiples of the per-test timeout.
const RUN_TIMEOUT_FACTOR: u64 = 10;

pub struct PytestFramework {
    python: String,
    timeout_secs: u64,
    report_dir: PathBuf,
}

impl PytestFramework {
    pub fn new(python: impl Into<String>, timeout_secs: u64, report_dir: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            timeout_secs,
            report_dir: report_dir.into(),
        }
    }

    pub fn from_config(config: &FrameworkConfig) -> Self {
        Self::new(&config.python, config.timeout_secs, &config.report_dir)
    }

    /// Report location for a test file. Distinct test files get distinct
    /// reports so concurrent runs do not clobber each other.
    pub fn report_path(&self, test_file: &Path) -> PathBuf {
        let stem = test_file
            .file_stem()
            .map_or_else(|| "pytest".into(), |stem| stem.to_string_lossy());
        self.report_dir.join(format!("{stem}.json"))
    }

    pub fn args(&self, test_file: &Path, report: &Path) -> Vec<String> {
        vec![
            "-m".to_string(),
            "pytest".to_string(),
            test_file.display().to_string(),
            "--json-report".to_string(),
            "--tb=long".to_string(),
            "-s".to_string(),
            format!("--execution-timeout={}", self.timeout_secs),
            format!("--json-report-file={}", report.display()),
        ]
    }

    /// Run pytest on `test_file` and return the raw report text.
    pub async fn run(&self, test_file: &Path) -> Result<String, FrameworkError> {
        let report = self.report_path(test_file);
        tokio::fs::create_dir_all(&self.report_dir)
            .await
            .map_err(|source| FrameworkError::Report {
                path: self.report_dir.clone(),
                source,
            })?;
        // A stale report from an earlier run must not be mistaken for this one.
        let _ = tokio::fs::remove_file(&report).await;

        let mut child = Command::new(&self.python)
            .args(self.args(test_file, &report))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FrameworkError::Spawn {
                command: self.python.clone(),
                source,
            })?;

        let budget = self.timeout_secs.saturating_mul(RUN_TIMEOUT_FACTOR);
        match tokio::time::timeout(Duration::from_secs(budget), child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(path = %test_file.display(), code = ?status.code(), "pytest finished");
            }
            Ok(Err(source)) => {
                return Err(FrameworkError::Spawn {
                    command: self.python.clone(),
                    source,
                });
            }
            Err(_) => return Err(FrameworkError::Timeout(budget)),
        }

        tokio::fs::read_to_string(&report)
            .await
            .map_err(|source| FrameworkError::Report {
                path: report,
                source,
            })
    }
}

#[async_trait]
impl TestFramework for PytestFramework {
    fn name(&self) -> &str {
        "pytest"
    }

    async fn execute(&self, path: &Path) -> Vec<DiagnosticRecord> {
        match self.run(path).await {
            Ok(report) => DiagnosticNormalizer::normalize_str(&report),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "pytest run produced no report");
                Vec::new()
            }
        }
    }
}
