//! Infrastructure layer module
//!
//! Adapters behind the domain ports and the ambient plumbing:
//! - OpenAI Responses generation backend
//! - pytest validation collaborator
//! - Configuration management
//! - Logging infrastructure
//! - Artifact output

pub mod backends;
pub mod config;
pub mod frameworks;
pub mod logging;
pub mod output;

pub use backends::{OpenAiResponsesBackend, OpenAiResponsesFactory};
pub use frameworks::PytestFramework;
pub use output::ArtifactWriter;
