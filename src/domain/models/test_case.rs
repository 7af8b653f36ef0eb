use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::candidate::Candidate;
use super::diagnostic::DiagnosticRecord;

/// A generated pytest function together with the diagnostic of its last run.
///
/// Identity is the normalized body: two cases with the same body are the same
/// test regardless of name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub param: String,
    /// Function body, already indented.
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<DiagnosticRecord>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param: String::new(),
            code: code.into(),
            result: None,
        }
    }

    /// Build a case from model output, stripping any `def` header and stray
    /// top-level code from the body.
    pub fn generated(name: impl Into<String>, code: &str) -> Self {
        Self::new(name, normalize_body(code))
    }

    pub fn with_result(mut self, result: DiagnosticRecord) -> Self {
        self.result = Some(result);
        self
    }

    /// Render as a Python function definition.
    pub fn to_py(&self) -> String {
        format!("def {}({}):\n{}", self.name, self.param, self.code)
    }
}

/// Drop a leading `def ...:` line and keep only lines inside the first line's
/// indentation. Unindented bodies are indented with a tab.
pub fn normalize_body(code: &str) -> String {
    let body = if code.starts_with("def ") {
        code.split_once(":\n").map_or(code, |(_, rest)| rest)
    } else {
        code
    };

    let lines: Vec<&str> = body.split('\n').collect();
    let first = lines.first().copied().unwrap_or_default();
    let indent_width = first.len() - first.trim_start_matches(' ').len();

    if indent_width > 0 {
        let indent = &first[..indent_width];
        lines
            .into_iter()
            .filter(|line| line.starts_with(indent))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        lines
            .into_iter()
            .map(|line| format!("\t{line}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl PartialEq for TestCase {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for TestCase {}

impl Hash for TestCase {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl Candidate for TestCase {
    type Key = String;

    fn semantic_key(&self) -> Self::Key {
        self.code.clone()
    }

    fn summary(&self) -> String {
        match &self.result {
            Some(result) => format!("[{}] {}", self.name, result.summary()),
            None => format!("[{}]", self.name),
        }
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Some(result) => write!(f, "{}\n> {}", self.to_py(), result.summary()),
            None => f.write_str(&self.to_py()),
        }
    }
}

/// One generated function as the model returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedCode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
}

/// Wire format the model answers with when asked for tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedBatch {
    #[serde(default)]
    pub codes: Vec<GeneratedCode>,
}

impl GeneratedBatch {
    pub fn into_cases(self) -> Vec<TestCase> {
        self.codes
            .into_iter()
            .map(|generated| TestCase::generated(generated.name, &generated.code))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::FaultKind;

    #[test]
    fn test_normalize_strips_def_header() {
        let code = "def test_x():\n    assert f(1) == 2\n    g()\nprint('stray')";
        assert_eq!(normalize_body(code), "    assert f(1) == 2\n    g()");
    }

    #[test]
    fn test_normalize_indents_flat_body() {
        assert_eq!(normalize_body("x = 1\nassert x"), "\tx = 1\n\tassert x");
    }

    #[test]
    fn test_equality_is_by_body() {
        let a = TestCase::new("test_a", "    assert True");
        let b = TestCase::new("test_b", "    assert True");
        assert_eq!(a, b);
        assert_eq!(a.semantic_key(), b.semantic_key());
    }

    #[test]
    fn test_to_py_and_summary() {
        let case = TestCase::generated("test_div", "    divide(1, 0)").with_result(
            DiagnosticRecord::unlocated(FaultKind::named("ZeroDivisionError"), "division by zero"),
        );
        assert_eq!(case.to_py(), "def test_div():\n    divide(1, 0)");
        assert_eq!(
            case.summary(),
            "[test_div] ZeroDivisionError: division by zero"
        );
    }

    #[test]
    fn test_batch_into_cases() {
        let batch: GeneratedBatch = serde_json::from_str(
            r#"{"codes": [{"name": "test_one", "code": "def test_one():\n    assert 1"}]}"#,
        )
        .unwrap();
        let cases = batch.into_cases();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].code, "    assert 1");
    }
}
