//! Persisted run artifacts
//!
//! Layout under the output directory:
//! - `errorlines/{function}.json`: located error lines
//! - `{function}_neg_test.py` / `{function}_neg_test.json`: negative tests
//! - `{function}_pos_test.py` / `{function}_pos_test.json`: positive tests
//! - `response/{function}.json`: per-function summary message

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::OutputError;
use crate::domain::models::{ErrorLine, ErrorLineBatch, TestCase};
use crate::services::FunctionReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TestFile {
    codes: Vec<TestCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseTests {
    pub negatives: Vec<CodeEntry>,
    pub positives: Vec<CodeEntry>,
}

/// Summary of one function's run, as handed to downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseMessage {
    pub function_name: String,
    pub success: bool,
    pub message: String,
    pub tests: ResponseTests,
}

impl ResponseMessage {
    pub fn from_report(report: &FunctionReport) -> Self {
        let entries = |tests: &[TestCase]| {
            tests
                .iter()
                .map(|test| CodeEntry { code: test.to_py() })
                .collect()
        };
        let message = if report.is_success() {
            String::new()
        } else {
            format!("no test raising the target fault was found in '{}'", report.function)
        };
        Self {
            function_name: report.function.clone(),
            success: report.is_success(),
            message,
            tests: ResponseTests {
                negatives: entries(&report.negatives),
                positives: entries(&report.positives),
            },
        }
    }
}

/// Writes artifacts below one output directory.
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `errorlines/{function}.json`.
    pub async fn write_error_lines(
        &self,
        function: &str,
        lines: &[ErrorLine],
    ) -> Result<PathBuf, OutputError> {
        let path = self.root.join("errorlines").join(format!("{function}.json"));
        let batch = ErrorLineBatch {
            lines: lines.to_vec(),
        };
        write_json(&path, &batch).await?;
        Ok(path)
    }

    /// Write `{function}_{kind}_test.py` and its JSON twin. Nothing is written
    /// for an empty list.
    pub async fn write_tests(
        &self,
        function: &str,
        kind: &str,
        tests: &[TestCase],
    ) -> Result<Vec<PathBuf>, OutputError> {
        if tests.is_empty() {
            return Ok(Vec::new());
        }

        let py_path = self.root.join(format!("{function}_{kind}_test.py"));
        let source = tests
            .iter()
            .map(TestCase::to_py)
            .collect::<Vec<_>>()
            .join("\n\n");
        write_text(&py_path, &source).await?;

        let json_path = self.root.join(format!("{function}_{kind}_test.json"));
        let file = TestFile {
            codes: tests.to_vec(),
        };
        write_json(&json_path, &file).await?;

        Ok(vec![py_path, json_path])
    }

    /// Write `response/{function}.json`.
    pub async fn write_response(&self, report: &FunctionReport) -> Result<PathBuf, OutputError> {
        let path = self
            .root
            .join("response")
            .join(format!("{}.json", report.function));
        write_json(&path, &ResponseMessage::from_report(report)).await?;
        Ok(path)
    }

    /// Every artifact of one function.
    pub async fn write_report(&self, report: &FunctionReport) -> Result<Vec<PathBuf>, OutputError> {
        let mut written = vec![
            self.write_error_lines(&report.function, &report.error_lines)
                .await?,
        ];
        written.extend(self.write_tests(&report.function, "neg", &report.negatives).await?);
        written.extend(self.write_tests(&report.function, "pos", &report.positives).await?);
        written.push(self.write_response(report).await?);
        Ok(written)
    }

    /// Read an error-line file written by [`ArtifactWriter::write_error_lines`].
    pub async fn read_error_lines(path: &Path) -> Result<Vec<ErrorLine>, OutputError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| OutputError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let batch: ErrorLineBatch = serde_json::from_str(&text)?;
        Ok(batch.lines)
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    let text = serde_json::to_string_pretty(value)?;
    write_text(path, &text).await
}

async fn write_text(path: &Path, text: &str) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| OutputError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, text)
        .await
        .map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DiagnosticRecord;

    fn report() -> FunctionReport {
        FunctionReport {
            function: "Calc.divide".to_string(),
            error_lines: vec![ErrorLine::new("return a / b", 3, "Calc.divide", "b may be 0")],
            negatives: vec![TestCase::new("test_neg_1", "    Calc().divide(1, 0)")],
            positives: vec![
                TestCase::new("test_pos_1", "    assert Calc().divide(4, 2) == 2")
                    .with_result(DiagnosticRecord::passed()),
            ],
        }
    }

    #[tokio::test]
    async fn test_write_report_layout() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());

        let written = writer.write_report(&report()).await.unwrap();
        assert_eq!(written.len(), 6);

        let neg = std::fs::read_to_string(dir.path().join("Calc.divide_neg_test.py")).unwrap();
        assert_eq!(neg, "def test_neg_1():\n    Calc().divide(1, 0)");

        let pos: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("Calc.divide_pos_test.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(pos["codes"][0]["name"], "test_pos_1");
        assert_eq!(pos["codes"][0]["result"]["type"], "None");

        let response: ResponseMessage = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("response/Calc.divide.json")).unwrap(),
        )
        .unwrap();
        assert!(response.success);
        assert_eq!(response.function_name, "Calc.divide");
        assert_eq!(
            response.tests.negatives,
            vec![CodeEntry {
                code: "def test_neg_1():\n    Calc().divide(1, 0)".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_function_writes_no_test_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let report = FunctionReport {
            negatives: Vec::new(),
            positives: Vec::new(),
            ..report()
        };

        let written = writer.write_report(&report).await.unwrap();
        assert_eq!(written.len(), 2);
        assert!(!dir.path().join("Calc.divide_neg_test.py").exists());

        let response = ResponseMessage::from_report(&report);
        assert!(!response.success);
        assert!(!response.message.is_empty());
    }

    #[tokio::test]
    async fn test_error_lines_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());

        let path = writer
            .write_error_lines("Calc.divide", &report().error_lines)
            .await
            .unwrap();
        let lines = ArtifactWriter::read_error_lines(&path).await.unwrap();

        assert_eq!(lines, report().error_lines);
    }

    #[tokio::test]
    async fn test_read_missing_error_lines() {
        let err = ArtifactWriter::read_error_lines(Path::new("/nonexistent/lines.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, OutputError::Io { .. }));
    }
}
