//! Faultline - fault-line discovery and test generation
//!
//! Faultline asks a language model for lines of a Python source file that can
//! raise a target exception, then asks it for pytest tests that raise that
//! exception exactly there (negative tests) and tests that raise nothing
//! (positive tests). Every answer is checked by actually running it, and the
//! verdicts are fed back to the model until enough tests are accepted.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, ports and typed errors
//! - **Service Layer** (`services`): source index, diagnostic normalizer,
//!   convergence engine, tools and the generation pipeline
//! - **Infrastructure Layer** (`infrastructure`): OpenAI Responses backend,
//!   pytest runner, configuration, logging and artifact output
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use faultline::services::{ConvergenceEngine, ConvergenceEngineConfig};
//!
//! let engine = ConvergenceEngine::new(backend, ConvergenceEngineConfig::new(3));
//! let accepted = engine.run(&tool).await;
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{BackendError, FrameworkError, OutputError, SourceIndexError, ToolError};
pub use domain::models::{
    Candidate, Config, DiagnosticRecord, ErrorLine, FaultKind, Resource, SourceFile, TestCase,
};
pub use domain::ports::{
    BackendFactory, BackendProfile, ConvergenceTool, GenerationBackend, ResponseHandle,
    ResponseStatus, TestFramework, ToolRequest,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ConvergenceEngine, ConvergenceEngineConfig, DiagnosticNormalizer, GenerationPipeline,
    SourceIndex,
};
