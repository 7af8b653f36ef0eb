//! Error-line finder tool.
//!
//! Asks the model for lines of a source file that may raise the target fault,
//! re-resolves each quoted line against the [`SourceIndex`], and keeps only
//! lines that land inside an indexed function.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::ToolError;
use crate::domain::models::{ErrorLine, ErrorLineBatch};
use crate::domain::ports::{ConvergenceTool, ToolRequest};
use crate::services::model_output::parse_model_json;
use crate::services::source_index::{quotes, SourceIndex};

/// Finds candidate fault locations in one source file.
pub struct ErrorLineFinder {
    index: Arc<SourceIndex>,
    path: PathBuf,
    source: String,
    fault: String,
}

impl ErrorLineFinder {
    pub fn new(
        index: Arc<SourceIndex>,
        path: impl Into<PathBuf>,
        source: impl Into<String>,
        fault: impl Into<String>,
    ) -> Self {
        Self {
            index,
            path: path.into(),
            source: source.into(),
            fault: fault.into(),
        }
    }

    fn query(&self, scope: &str) -> String {
        format!(
            "Find {scope} codes with potential to raise {} in '{}'.",
            self.fault,
            self.path.display()
        )
    }
}

#[async_trait]
impl ConvergenceTool for ErrorLineFinder {
    type Output = ErrorLine;
    type Feedback = bool;

    fn name(&self) -> &str {
        "error_line_finder"
    }

    fn build_request(&self, feedback: Option<&bool>) -> ToolRequest {
        if feedback.copied().unwrap_or(false) {
            return ToolRequest::instructions_only(vec![self.query("more")]);
        }

        ToolRequest::new(
            vec![code_block(&self.path, &self.source)],
            vec![self.query("all")],
        )
    }

    async fn decode(&self, raw: &str) -> Result<Vec<ErrorLine>, ToolError> {
        let batch: ErrorLineBatch = parse_model_json(raw)?;
        Ok(batch
            .lines
            .into_iter()
            .map(|mut line| {
                line.lineno = self
                    .index
                    .find(&line.method, &line.code, line.lineno)
                    .and_then(|found| i64::try_from(found).ok())
                    .unwrap_or(0);
                line
            })
            .collect())
    }

    fn is_valid(&self, candidate: &ErrorLine) -> bool {
        candidate.is_located()
            && self.index.contains(&candidate.method)
            && self
                .index
                .statements(&candidate.method)
                .iter()
                .any(|statement| quotes(statement, &candidate.code))
    }

    fn is_terminated(&self, _accepted: &[ErrorLine]) -> bool {
        false
    }

    fn build_feedback(&self, _rejected: Vec<ErrorLine>) -> bool {
        true
    }
}

/// Context block quoting a whole file.
pub fn code_block(path: &Path, source: &str) -> String {
    format!("### {}\n```python\n{source}\n```", path.display())
}

/// Keep only lines of the requested functions; an empty request keeps all.
pub fn filter_functions(lines: Vec<ErrorLine>, functions: &[String]) -> Vec<ErrorLine> {
    if functions.is_empty() {
        return lines;
    }
    lines
        .into_iter()
        .filter(|line| functions.contains(&line.method))
        .collect()
}

/// Group lines per function, in order of first appearance.
pub fn group_by_function(lines: Vec<ErrorLine>) -> Vec<(String, Vec<ErrorLine>)> {
    let mut groups: Vec<(String, Vec<ErrorLine>)> = Vec::new();
    for line in lines {
        match groups.iter_mut().find(|(method, _)| *method == line.method) {
            Some((_, group)) => group.push(line),
            None => groups.push((line.method.clone(), vec![line])),
        }
    }
    groups
}
