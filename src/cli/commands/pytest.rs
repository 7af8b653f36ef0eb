//! `pytest`: run one test file through the validation collaborator.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{diagnostics_table, output, CommandOutput};
use crate::domain::models::{Config, DiagnosticRecord};
use crate::domain::ports::TestFramework;
use crate::infrastructure::PytestFramework;

#[derive(Args, Debug)]
pub struct PytestArgs {
    /// Test file to run
    #[arg(short, long, value_name = "FILE")]
    pub src: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct PytestOutput {
    pub file: String,
    pub passed: usize,
    pub failed: usize,
    pub diagnostics: Vec<DiagnosticRecord>,
}

impl PytestOutput {
    pub fn new(file: String, diagnostics: Vec<DiagnosticRecord>) -> Self {
        let passed = diagnostics.iter().filter(|d| d.is_pass()).count();
        Self {
            file,
            passed,
            failed: diagnostics.len() - passed,
            diagnostics,
        }
    }
}

impl CommandOutput for PytestOutput {
    fn to_human(&self) -> String {
        if self.diagnostics.is_empty() {
            return format!("No diagnostics for {} (no report was produced).", self.file);
        }
        format!(
            "{}\n{}: {} passed, {} failed",
            diagnostics_table(&self.diagnostics),
            self.file,
            self.passed,
            self.failed
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: PytestArgs, config: Config, json_mode: bool) -> Result<()> {
    let framework = PytestFramework::from_config(&config.framework);
    let diagnostics = framework.execute(&args.src).await;
    output(
        &PytestOutput::new(args.src.display().to_string(), diagnostics),
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::FaultKind;

    #[test]
    fn test_counts() {
        let output = PytestOutput::new(
            "test_a.py".to_string(),
            vec![
                DiagnosticRecord::passed(),
                DiagnosticRecord::unlocated(FaultKind::named("TypeError"), "bad operand"),
                DiagnosticRecord::passed(),
            ],
        );
        assert_eq!(output.passed, 2);
        assert_eq!(output.failed, 1);
        assert_eq!(output.to_json()["diagnostics"][1]["type"], "TypeError");
    }

    #[test]
    fn test_empty_run_message() {
        let output = PytestOutput::new("test_a.py".to_string(), Vec::new());
        assert!(output.to_human().contains("no report"));
    }
}
