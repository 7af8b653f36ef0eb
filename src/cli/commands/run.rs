//! `run`: find error lines, then generate tests per function.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::cli::commands::generate::write_reports;
use crate::cli::commands::{
    artifact_writer, build_context, build_pipeline, parse_resource, read_sources,
    GenerationOverrides,
};
use crate::cli::output::{create_spinner, output};
use crate::domain::models::{Config, Resource};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source files; error lines are searched in the first one
    #[arg(short, long, required = true, num_args = 1.., value_name = "FILE")]
    pub src: Vec<PathBuf>,

    /// Extra context for the model as `title:content`
    #[arg(short, long, num_args = 1.., value_parser = parse_resource, value_name = "TITLE:CONTENT")]
    pub res: Vec<Resource>,

    /// Only generate tests for these functions
    #[arg(short, long, num_args = 1.., value_name = "NAME")]
    pub fcts: Vec<String>,

    #[command(flatten)]
    pub overrides: GenerationOverrides,
}

pub async fn execute(args: RunArgs, mut config: Config, json_mode: bool) -> Result<()> {
    args.overrides.apply(&mut config);

    let sources = read_sources(&args.src).await?;
    let context = build_context(&config, sources, args.res)?;
    let pipeline = build_pipeline(&config, context)?;

    let spinner = create_spinner("Finding error lines and generating tests", json_mode);
    let report = pipeline.run(&args.fcts).await;
    spinner.finish_and_clear();

    tracing::info!(
        error_lines = report.error_lines.len(),
        negatives = report.negative_count(),
        positives = report.positive_count(),
        "run finished"
    );

    let summary = write_reports(&artifact_writer(&config), &report.functions).await?;
    output(&summary, json_mode);
    Ok(())
}
