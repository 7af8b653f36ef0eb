//! Port trait definitions (Hexagonal Architecture)
//!
//! Interfaces the core services depend on:
//! - GenerationBackend: remote model submit/poll with conversation state
//! - TestFramework: runs generated tests and reports diagnostics
//! - ConvergenceTool: policies driving one convergence run

pub mod convergence_tool;
pub mod generation_backend;
pub mod test_framework;

pub use convergence_tool::{ConvergenceTool, ToolRequest};
pub use generation_backend::{
    BackendFactory, BackendProfile, GenerationBackend, ResponseHandle, ResponseStatus,
};
pub use test_framework::TestFramework;
