//! `find-lines`: locate lines that may raise the target fault.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::commands::{artifact_writer, build_context, build_pipeline, read_sources};
use crate::cli::output::{create_spinner, output, CommandOutput};
use crate::domain::models::{Config, ErrorLine};
use crate::services::error_line_finder::group_by_function;

#[derive(Args, Debug)]
pub struct FindLinesArgs {
    /// Source file to search
    #[arg(short, long, value_name = "FILE")]
    pub src: PathBuf,

    /// Only keep lines of these functions
    #[arg(short, long, num_args = 1.., value_name = "NAME")]
    pub fcts: Vec<String>,

    /// Request rounds
    #[arg(short, long, value_name = "N")]
    pub iter: Option<usize>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct FunctionLines {
    pub function: String,
    pub lines: Vec<ErrorLine>,
    pub artifact: String,
}

#[derive(Debug, Serialize)]
pub struct FindLinesOutput {
    pub source: String,
    pub total: usize,
    pub functions: Vec<FunctionLines>,
}

impl CommandOutput for FindLinesOutput {
    fn to_human(&self) -> String {
        if self.functions.is_empty() {
            return format!("No error lines found in {}.", self.source);
        }

        let mut lines = vec![format!(
            "Found {} error line(s) in {} function(s) of {}:",
            self.total,
            self.functions.len(),
            self.source
        )];
        for function in &self.functions {
            lines.push(String::new());
            lines.push(format!(
                "{} ({})",
                console::style(&function.function).bold(),
                function.artifact
            ));
            lines.extend(function.lines.iter().map(ToString::to_string));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: FindLinesArgs, mut config: Config, json_mode: bool) -> Result<()> {
    if let Some(iter) = args.iter {
        config.generation.finder_iterations = iter;
    }
    if let Some(out) = &args.out {
        config.output.dir = out.display().to_string();
    }

    let sources = read_sources(std::slice::from_ref(&args.src)).await?;
    let context = build_context(&config, sources, Vec::new())?;
    let pipeline = build_pipeline(&config, context)?;

    let spinner = create_spinner(format!("Searching {}", args.src.display()), json_mode);
    let found = pipeline.find_error_lines(&args.fcts).await;
    spinner.finish_and_clear();

    let writer = artifact_writer(&config);
    let total = found.len();
    let mut functions = Vec::new();
    for (function, lines) in group_by_function(found) {
        let path = writer
            .write_error_lines(&function, &lines)
            .await
            .context("Failed to write error lines")?;
        functions.push(FunctionLines {
            function,
            lines,
            artifact: path.display().to_string(),
        });
    }

    output(
        &FindLinesOutput {
            source: args.src.display().to_string(),
            total,
            functions,
        },
        json_mode,
    );
    Ok(())
}
