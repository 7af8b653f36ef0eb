
use async_trait::async_trait;

use super::{FeedbackBucket, GenerationContext, TestGenerator, SYNTAX_ERROR};
use crate::domain::errors::ToolError;
use crate::domain::models::{FaultKind, TestCase};
use crate::domain::ports::{ConvergenceTool, ToolRequest};

/// Generates tests that must run a function without raising anything.
pub struct PositiveTestGenerator {
    base: TestGenerator,
}

impl PositiveTestGenerator {
    pub fn new(context: GenerationContext, function: impl Into<String>, target_count: usize) -> Self {
        let function = function.into();
        let label = format!("{function}_pos");
        Self {
            base: TestGenerator::new(
                context,
                vec![FaultKind::Passed],
                function,
                target_count,
                label,
            ),
        }
    }

    fn initial_request(&self) -> ToolRequest {
        let instruction = format!(
            "Write {} tests not to trigger any error in '{}'.",
            self.base.context().candidates,
            self.base.target_function()
        );
        ToolRequest::new(self.base.context().info_blocks(), vec![instruction])
    }

    fn feedback_request(&self, buckets: &[FeedbackBucket]) -> ToolRequest {
        let mut instructions = Vec::new();
        for bucket in buckets {
            for (summary, names) in &bucket.groups {
                let names = if bucket.kind == SYNTAX_ERROR {
                    "All tests".to_string()
                } else {
                    names.join(", ")
                };
                instructions.push(format!("{names} triggers `{summary}`."));
            }
        }

        instructions.push(format!(
            "Rewrite test codes not to trigger {} in '{}'.",
            self.base.pass_kinds_text(),
            self.base.target_function()
        ));
        ToolRequest::instructions_only(instructions)
    }
}

#[async_trait]
impl ConvergenceTool for PositiveTestGenerator {
    type Output = TestCase;
    type Feedback = Vec<TestCase>;

    fn name(&self) -> &str {
        "positive_test_generator"
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
