//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::commands::find_lines::FindLinesArgs;
use crate::cli::commands::generate::GenerateArgs;
use crate::cli::commands::pytest::PytestArgs;
use crate::cli::commands::run::RunArgs;

#[derive(Parser, Debug)]
#[command(name = "faultline")]
#[command(about = "Faultline - find fault-prone lines and generate pytest tests for them", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Extra configuration file, merged over .faultline/config.yaml
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find lines that may raise the target fault
    FindLines(FindLinesArgs),

    /// Generate tests for previously found error lines
    Generate(GenerateArgs),

    /// Find error lines, then generate tests for every affected function
    Run(RunArgs),

    /// Run a test file with pytest and show its diagnostics
    Pytest(PytestArgs),
}
