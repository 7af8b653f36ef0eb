pub mod convergence_engine;
pub mod diagnostic_normalizer;
pub mod error_line_finder;
pub mod model_output;
pub mod pipeline;
pub mod source_index;
pub mod test_generator;

pub use convergence_engine::{ConvergenceEngine, ConvergenceEngineConfig};
pub use diagnostic_normalizer::DiagnosticNormalizer;
pub use error_line_finder::ErrorLineFinder;
pub use pipeline::{FunctionReport, GenerationPipeline, PipelineReport};
pub use source_index::SourceIndex;
pub use test_generator::{GenerationContext, NegativeTestGenerator, PositiveTestGenerator};
