//! Convergence tool port
//!
//! A tool supplies the policies the convergence engine runs with: how to build
//! a request, how to decode model output into candidates, which candidates are
//! acceptable, when enough have been accepted, and what feedback the next
//! round gets from the rejected ones.

use async_trait::async_trait;

use crate::domain::errors::ToolError;
use crate::domain::models::Candidate;

/// One backend request: context blocks followed by instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolRequest {
    pub info: Vec<String>,
    pub instructions: Vec<String>,
}

impl ToolRequest {
    pub fn new(info: Vec<String>, instructions: Vec<String>) -> Self {
        Self { info, instructions }
    }

    /// A follow-up turn that relies on the conversation for context.
    pub fn instructions_only(instructions: Vec<String>) -> Self {
        Self {
            info: Vec::new(),
            instructions,
        }
    }

    pub fn into_messages(self) -> Vec<String> {
        let mut messages = self.info;
        messages.extend(self.instructions);
        messages
    }
}

#[async_trait]
pub trait ConvergenceTool: Send + Sync {
    type Output: Candidate;
    type Feedback: Send + Sync;

    fn name(&self) -> &str;

    /// Request for the next round; `None` on the first round.
    fn build_request(&self, feedback: Option<&Self::Feedback>) -> ToolRequest;

    /// Turn raw backend text into candidates. Errors discard the round.
    async fn decode(&self, raw: &str) -> Result<Vec<Self::Output>, ToolError>;

    fn is_valid(&self, candidate: &Self::Output) -> bool;

    fn is_terminated(&self, accepted: &[Self::Output]) -> bool;

    fn build_feedback(&self, rejected: Vec<Self::Output>) -> Self::Feedback;
}
