//! Generation pipeline.
//!
//! Drives the tools end to end for one source set: find error lines, group
//! them per function, then for each function generate negative tests (one
//! fresh conversation per error line) followed by positive tests.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::domain::models::{ErrorLine, FaultKind, GenerationConfig, TestCase};
use crate::domain::ports::{BackendFactory, BackendProfile};
use crate::services::convergence_engine::{ConvergenceEngine, ConvergenceEngineConfig};
use crate::services::error_line_finder::{filter_functions, group_by_function, ErrorLineFinder};
use crate::services::test_generator::{
    GenerationContext, NegativeTestGenerator, PositiveTestGenerator,
};

/// Tests generated for one function.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FunctionReport {
    pub function: String,
    pub error_lines: Vec<ErrorLine>,
    pub negatives: Vec<TestCase>,
    pub positives: Vec<TestCase>,
}

impl FunctionReport {
    /// At least one negative test was found.
    pub fn is_success(&self) -> bool {
        !self.negatives.is_empty()
    }
}

/// Outcome of a full run over one source set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub error_lines: Vec<ErrorLine>,
    pub functions: Vec<FunctionReport>,
}

impl PipelineReport {
    pub fn negative_count(&self) -> usize {
        self.functions.iter().map(|f| f.negatives.len()).sum()
    }

    pub fn positive_count(&self) -> usize {
        self.functions.iter().map(|f| f.positives.len()).sum()
    }
}

pub struct GenerationPipeline<F: BackendFactory> {
    factory: F,
    context: GenerationContext,
    settings: GenerationConfig,
}

impl<F: BackendFactory> GenerationPipeline<F> {
    pub const fn new(factory: F, context: GenerationContext, settings: GenerationConfig) -> Self {
        Self {
            factory,
            context,
            settings,
        }
    }

    pub const fn context(&self) -> &GenerationContext {
        &self.context
    }

    pub const fn settings(&self) -> &GenerationConfig {
        &self.settings
    }

    fn engine(&self, profile: BackendProfile, iterations: usize) -> ConvergenceEngine<F::Backend> {
        ConvergenceEngine::new(
            self.factory.create(profile),
            ConvergenceEngineConfig::new(iterations),
        )
    }

    /// Ask the model for lines of the primary source that may raise the
    /// configured fault, restricted to `functions` when non-empty.
    pub async fn find_error_lines(&self, functions: &[String]) -> Vec<ErrorLine> {
        let Some(primary) = self.context.primary_source() else {
            tracing::warn!("no source file to search for error lines");
            return Vec::new();
        };

        let finder = ErrorLineFinder::new(
            Arc::clone(&self.context.index),
            primary.path.clone(),
            primary.text.clone(),
            self.settings.fault.clone(),
        );
        let engine = self.engine(BackendProfile::ErrorLineFinder, self.settings.finder_iterations);
        let lines = filter_functions(engine.run(&finder).await, functions);

        tracing::info!(
            path = %primary.path.display(),
            lines = lines.len(),
            "error lines found"
        );
        lines
    }

    /// Negative tests for the error lines of one function.
    ///
    /// Each line gets its own conversation. Accepted tests are bucketed by the
    /// offending fragment they hit; once enough distinct fragments are covered
    /// the remaining lines are skipped.
    pub async fn generate_negatives(&self, lines: &[ErrorLine]) -> Vec<TestCase> {
        let target = self.settings.negative_target;
        let batches = Arc::new(AtomicUsize::new(0));
        let mut buckets: Vec<(String, Vec<TestCase>)> = Vec::new();

        for line in lines {
            tracing::info!(
                method = %line.method,
                lineno = line.lineno,
                code = %line.code,
                "generating negative tests"
            );

            let generator = NegativeTestGenerator::new(
                self.context.clone(),
                vec![FaultKind::named(self.settings.fault.clone())],
                line.clone(),
                target,
            )
            .with_batch_counter(Arc::clone(&batches));
            let engine = self.engine(BackendProfile::NegativeTests, self.settings.iterations);

            for test in engine.run(&generator).await {
                let fragment = test
                    .result
                    .as_ref()
                    .map(|result| result.code.clone())
                    .unwrap_or_default();
                match buckets.iter_mut().find(|(seen, _)| *seen == fragment) {
                    Some((_, tests)) => tests.push(test),
                    None => buckets.push((fragment, vec![test])),
                }
            }

            if buckets.len() >= target {
                break;
            }
        }

        let mut selected = select_round_robin(buckets, target);
        rename(&mut selected, "test_neg");
        selected
    }

    /// Positive tests for `function`.
    pub async fn generate_positives(&self, function: &str, target: usize) -> Vec<TestCase> {
        if target == 0 {
            return Vec::new();
        }
        tracing::info!(function, target, "generating positive tests");

        let generator = PositiveTestGenerator::new(self.context.clone(), function, target);
        let engine = self.engine(BackendProfile::PositiveTests, self.settings.iterations);

        let mut tests = engine.run(&generator).await;
        rename(&mut tests, "test_pos");
        tests
    }

    /// Negative then positive tests for one function. Positives are skipped
    /// when no negative test was found; otherwise they fill the remainder of
    /// the combined target.
    pub async fn generate_for_function(
        &self,
        function: String,
        lines: Vec<ErrorLine>,
    ) -> FunctionReport {
        let negatives = self.generate_negatives(&lines).await;
        if negatives.is_empty() {
            tracing::warn!(function = %function, "no negative test found, skipping positives");
            return FunctionReport {
                function,
                error_lines: lines,
                ..FunctionReport::default()
            };
        }

        let total = self.settings.negative_target + self.settings.positive_target;
        let positives = self
            .generate_positives(&function, total.saturating_sub(negatives.len()))
            .await;

        tracing::info!(
            function = %function,
            negatives = negatives.len(),
            positives = positives.len(),
            "function done"
        );
        FunctionReport {
            function,
            error_lines: lines,
            negatives,
            positives,
        }
    }

    /// Generate tests for already located error lines, one function at a time
    /// or several in parallel as configured.
    pub async fn generate(&self, lines: Vec<ErrorLine>) -> Vec<FunctionReport> {
        let concurrency = self.settings.concurrency.max(1);
        stream::iter(group_by_function(lines))
            .map(|(function, lines)| self.generate_for_function(function, lines))
            .buffered(concurrency)
            .collect()
            .await
    }

    /// Find error lines, then generate tests for every function they touch.
    pub async fn run(&self, functions: &[String]) -> PipelineReport {
        let error_lines = self.find_error_lines(functions).await;
        let functions = self.generate(error_lines.clone()).await;
        PipelineReport {
            error_lines,
            functions,
        }
    }
}

/// Pick up to `target` tests, one from each bucket in turn, skipping tests
/// already picked.
pub fn select_round_robin(buckets: Vec<(String, Vec<TestCase>)>, target: usize) -> Vec<TestCase> {
    let depth = buckets.iter().map(|(_, tests)| tests.len()).max().unwrap_or(0);
    let mut selected: Vec<TestCase> = Vec::new();

    'rounds: for i in 0..depth {
        for (_, tests) in &buckets {
            if selected.len() >= target {
                break 'rounds;
            }
            let Some(test) = tests.get(i) else {
                continue;
            };
            if !selected.contains(test) {
                selected.push(test.clone());
            }
        }
    }

    selected.truncate(target);
    selected
}

fn rename(tests: &mut [TestCase], prefix: &str) {
    for (i, test) in tests.iter_mut().enumerate() {
        test.name = format!("{prefix}_{}", i + 1);
    }
}
