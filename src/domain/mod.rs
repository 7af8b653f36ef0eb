//! Domain layer for faultline
//!
//! Candidate models, diagnostics, configuration and the ports the services
//! are written against.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{
    BackendError, FrameworkError, OutputError, SourceIndexError, SourceIndexResult, ToolError,
};
