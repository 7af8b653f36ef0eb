//! `generate`: negative and positive tests for saved error lines.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::{Cell, Color};
use serde::Serialize;

use crate::cli::commands::{
    artifact_writer, build_context, build_pipeline, parse_resource, read_sources,
    GenerationOverrides,
};
use crate::cli::output::{base_table, create_spinner, header, output, supports_color, CommandOutput};
use crate::domain::models::{Config, Resource};
use crate::infrastructure::ArtifactWriter;
use crate::services::FunctionReport;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Source files; failures must be raised in the first one
    #[arg(short, long, required = true, num_args = 1.., value_name = "FILE")]
    pub src: Vec<PathBuf>,

    /// Error-line file written by `find-lines`
    #[arg(short, long, value_name = "FILE")]
    pub err: PathBuf,

    /// Extra context for the model as `title:content`
    #[arg(short, long, num_args = 1.., value_parser = parse_resource, value_name = "TITLE:CONTENT")]
    pub res: Vec<Resource>,

    #[command(flatten)]
    pub overrides: GenerationOverrides,
}

/// Per-function result row.
#[derive(Debug, Serialize)]
pub struct FunctionSummary {
    pub function: String,
    pub success: bool,
    pub error_lines: usize,
    pub negatives: usize,
    pub positives: usize,
    pub artifacts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerationOutput {
    pub out_dir: String,
    pub functions: Vec<FunctionSummary>,
    pub finished_at: DateTime<Utc>,
}

impl CommandOutput for GenerationOutput {
    fn to_human(&self) -> String {
        if self.functions.is_empty() {
            return "No functions with error lines; nothing generated.".to_string();
        }

        let use_colors = supports_color();
        let mut table = base_table();
        table.set_header(header(&["Function", "Error lines", "Negative", "Positive", "Status"]));
        for function in &self.functions {
            let status = if function.success { "ok" } else { "no negatives" };
            let status_cell = match (use_colors, function.success) {
                (true, true) => Cell::new(status).fg(Color::Green),
                (true, false) => Cell::new(status).fg(Color::Yellow),
                (false, _) => Cell::new(status),
            };
            table.add_row(vec![
                Cell::new(&function.function),
                Cell::new(function.error_lines),
                Cell::new(function.negatives),
                Cell::new(function.positives),
                status_cell,
            ]);
        }

        format!(
            "{table}\nArtifacts written to {} at {}",
            self.out_dir,
            self.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Persist every report and summarize it.
pub async fn write_reports(
    writer: &ArtifactWriter,
    reports: &[FunctionReport],
) -> Result<GenerationOutput> {
    let mut functions = Vec::with_capacity(reports.len());
    for report in reports {
        let artifacts = writer
            .write_report(report)
            .await
            .with_context(|| format!("Failed to write artifacts for {}", report.function))?;
        functions.push(FunctionSummary {
            function: report.function.clone(),
            success: report.is_success(),
            error_lines: report.error_lines.len(),
            negatives: report.negatives.len(),
            positives: report.positives.len(),
            artifacts: artifacts
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
        });
    }

    Ok(GenerationOutput {
        out_dir: writer.root().display().to_string(),
        functions,
        finished_at: Utc::now(),
    })
}

pub async fn execute(args: GenerateArgs, mut config: Config, json_mode: bool) -> Result<()> {
    args.overrides.apply(&mut config);

    let lines = ArtifactWriter::read_error_lines(&args.err)
        .await
        .with_context(|| format!("Failed to read error lines from {}", args.err.display()))?;

    let sources = read_sources(&args.src).await?;
    let context = build_context(&config, sources, args.res)?;
    let pipeline = build_pipeline(&config, context)?;

    let spinner = create_spinner(format!("Generating tests for {} error line(s)", lines.len()), json_mode);
    let reports = pipeline.generate(lines).await;
    spinner.finish_and_clear();

    let summary = write_reports(&artifact_writer(&config), &reports).await?;
    output(&summary, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ErrorLine, TestCase};

    #[tokio::test]
    async fn test_write_reports_summarizes_each_function() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let reports = vec![
            FunctionReport {
                function: "Calc.divide".to_string(),
                error_lines: vec![ErrorLine::new("return a / b", 3, "Calc.divide", "")],
                negatives: vec![TestCase::new("test_neg_1", "    Calc().divide(1, 0)")],
                positives: Vec::new(),
            },
            FunctionReport {
                function: "add".to_string(),
                ..FunctionReport::default()
            },
        ];

        let summary = write_reports(&writer, &reports).await.unwrap();

        assert_eq!(summary.functions.len(), 2);
        assert!(summary.functions[0].success);
        assert_eq!(summary.functions[0].artifacts.len(), 4);
        assert!(!summary.functions[1].success);

        let human = temp_env::with_var("NO_COLOR", Some("1"), || summary.to_human());
        assert!(human.contains("Calc.divide"));
        assert!(human.contains("no negatives"));
        assert_eq!(summary.to_json()["functions"][0]["negatives"], 1);
    }
}
