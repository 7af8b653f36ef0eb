use async_trait::async_trait;

use super::{FeedbackBucket, GenerationContext, TestGenerator, SYNTAX_ERROR};
use crate::domain::errors::ToolError;
use crate::domain::models::{ErrorLine, FaultKind, TestCase};
use crate::domain::ports::{ConvergenceTool, ToolRequest};

/// Generates tests that must raise the target fault at one error line.
pub struct NegativeTestGenerator {
    base: TestGenerator,
    line: ErrorLine,
}

impl NegativeTestGenerator {
    pub fn new(
        context: GenerationContext,
        faults: Vec<FaultKind>,
        line: ErrorLine,
        target_count: usize,
    ) -> Self {
        let label = format!("{}_neg", line.method);
        Self {
            base: TestGenerator::new(context, faults, line.method.clone(), target_count, label),
            line,
        }
    }

    /// Use a shared batch counter across the lines of one function.
    #[must_use]
    pub fn with_batch_counter(
        mut self,
        batches: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    ) -> Self {
        self.base = self.base.with_batch_counter(batches);
        self
    }

    fn initial_request(&self) -> ToolRequest {
        let instruction = format!(
            "Write {} tests that trigger {} at `{}`, line {} of {}.",
            self.base.context().candidates,
            self.base.pass_kinds_text(),
            self.line.code,
            self.line.lineno,
            self.line.method
        );
        ToolRequest::new(self.base.context().info_blocks(), vec![instruction])
    }

    fn feedback_request(&self, buckets: &[FeedbackBucket]) -> ToolRequest {
        let function = self.base.target_function();
        let mut instructions = Vec::new();

        for bucket in buckets {
            let is_pass_kind = self
                .base
                .pass_kinds()
                .iter()
                .any(|kind| kind.as_str() == bucket.kind);

            for (summary, names) in &bucket.groups {
                let names = names.join(", ");
                let line = if is_pass_kind {
                    format!("{names} triggers `{summary}` but not in '{function}'.")
                } else if bucket.kind == FaultKind::PASSED {
                    format!("{names} don't trigger any error.")
                } else if bucket.kind == SYNTAX_ERROR {
                    format!("All tests triggers `{summary}`.")
                } else {
                    format!("{names} triggers `{summary}`.")
                };
                instructions.push(line);
            }
        }

        instructions.push(format!(
            "Rewrite test codes to trigger {} in '{function}'.",
            self.base.pass_kinds_text()
        ));
        ToolRequest::instructions_only(instructions)
    }
}

#[async_trait]
impl ConvergenceTool for NegativeTestGenerator {
    type Output = TestCase;
    type Feedback = Vec<TestCase>;

    fn name(&self) -> &str {
        "negative_test_generator"
    }

    fn build_request(&self, feedback: Option<&Vec<TestCase>>) -> ToolRequest {
        let mut request = match feedback {
            Some(rejected) if !rejected.is_empty() => {
                self.feedback_request(&self.base.classify(rejected))
            }
            _ => self.initial_request(),
        };
        request.instructions.extend(self.base.private_target_hint());
        request
    }

    async fn decode(&self, raw: &str) -> Result<Vec<TestCase>, ToolError> {
        self.base.decode_batch(raw).await
    }

    fn is_valid(&self, candidate: &TestCase) -> bool {
        self.base.accepts(candidate)
    }

    fn is_terminated(&self, accepted: &[TestCase]) -> bool {
        self.base.is_enough(accepted)
    }

    fn build_feedback(&self, rejected: Vec<TestCase>) -> Vec<TestCase> {
        rejected
    }
}
