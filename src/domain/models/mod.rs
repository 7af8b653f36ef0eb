pub mod candidate;
pub mod config;
pub mod diagnostic;
pub mod error_line;
pub mod source_file;
pub mod test_case;

pub use candidate::Candidate;
pub use config::{
    BackendConfig, Config, FrameworkConfig, GenerationConfig, LoggingConfig, OutputConfig,
    ToolOptions,
};
pub use diagnostic::{DiagnosticRecord, FaultKind};
pub use error_line::{ErrorLine, ErrorLineBatch};
pub use source_file::{Resource, SourceFile};
pub use test_case::{normalize_body, GeneratedBatch, GeneratedCode, TestCase};
