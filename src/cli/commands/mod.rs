//! CLI command implementations and the plumbing they share.

pub mod find_lines;
pub mod generate;
pub mod pytest;
pub mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::domain::models::{Config, Resource, SourceFile};
use crate::infrastructure::{ArtifactWriter, OpenAiResponsesFactory, PytestFramework};
use crate::services::{GenerationContext, GenerationPipeline, SourceIndex};

/// Command line overrides of the `generation` and `output` configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct GenerationOverrides {
    /// Request rounds per tool run
    #[arg(short, long = "iter", value_name = "N")]
    pub iter: Option<usize>,

    /// Tests requested per round
    #[arg(short, long = "gen", value_name = "N")]
    pub generate: Option<usize>,

    /// Target number of negative tests
    #[arg(short, long, value_name = "N")]
    pub neg: Option<usize>,

    /// Target number of positive tests
    #[arg(short, long, value_name = "N")]
    pub pos: Option<usize>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

impl GenerationOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(iter) = self.iter {
            config.generation.iterations = iter;
        }
        if let Some(generate) = self.generate {
            config.generation.candidates_per_round = generate;
        }
        if let Some(neg) = self.neg {
            config.generation.negative_target = neg;
        }
        if let Some(pos) = self.pos {
            config.generation.positive_target = pos;
        }
        if let Some(out) = &self.out {
            config.output.dir = out.display().to_string();
        }
    }
}

/// `title:content` resource argument.
pub fn parse_resource(value: &str) -> Result<Resource, String> {
    value.parse()
}

pub async fn read_sources(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let source = SourceFile::read(path)
            .await
            .with_context(|| format!("Failed to read source file {}", path.display()))?;
        sources.push(source);
    }
    Ok(sources)
}

/// Index the primary (first) source and wire the pytest collaborator.
pub fn build_context(
    config: &Config,
    sources: Vec<SourceFile>,
    resources: Vec<Resource>,
) -> Result<GenerationContext> {
    let primary = sources
        .first()
        .context("At least one source file is required")?;
    let index = SourceIndex::from_source(&primary.text)
        .with_context(|| format!("Failed to index {}", primary.path.display()))?;

    tracing::info!(
        path = %primary.path.display(),
        units = index.len(),
        "source indexed"
    );

    Ok(GenerationContext {
        index: Arc::new(index),
        framework: Arc::new(PytestFramework::from_config(&config.framework)),
        sources,
        resources,
        work_dir: PathBuf::from(&config.framework.work_dir),
        candidates: config.generation.candidates_per_round,
    })
}

pub fn build_pipeline(
    config: &Config,
    context: GenerationContext,
) -> Result<GenerationPipeline<OpenAiResponsesFactory>> {
    let factory = OpenAiResponsesFactory::new(&config.backend)
        .context("Failed to create generation backend")?;
    Ok(GenerationPipeline::new(factory, context, config.generation.clone()))
}

pub fn artifact_writer(config: &Config) -> ArtifactWriter {
    ArtifactWriter::new(Path::new(&config.output.dir))
}
