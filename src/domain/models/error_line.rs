use std::fmt;

use serde::{Deserialize, Serialize};

use super::candidate::Candidate;

/// A source location the model believes can raise the target fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLine {
    /// Code fragment quoted by the model.
    #[serde(default)]
    pub code: String,
    /// Absolute line number; 0 when the location could not be resolved.
    #[serde(default)]
    pub lineno: i64,
    /// Qualified function (`Class.method`) the line belongs to.
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub reason: String,
}

impl ErrorLine {
    pub fn new(
        code: impl Into<String>,
        lineno: i64,
        method: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            lineno,
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Whether the location was resolved against the source index.
    pub const fn is_located(&self) -> bool {
        self.lineno > 0
    }
}

impl Candidate for ErrorLine {
    type Key = (String, i64, String);

    fn semantic_key(&self) -> Self::Key {
        (self.code.clone(), self.lineno, self.method.clone())
    }

    fn summary(&self) -> String {
        format!("{}: {}", self.method, self.lineno)
    }
}

impl fmt::Display for ErrorLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "- [{}: {}] {}\n  {}",
            self.method, self.lineno, self.code, self.reason
        )
    }
}

/// Wire format the model answers with when asked for error lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorLineBatch {
    #[serde(default)]
    pub lines: Vec<ErrorLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_reason() {
        let a = ErrorLine::new("x = f(y)", 12, "Foo.bar", "y may be None");
        let b = ErrorLine::new("x = f(y)", 12, "Foo.bar", "different wording");
        assert_eq!(a.semantic_key(), b.semantic_key());
        assert_ne!(a, b);
    }

    #[test]
    fn test_batch_tolerates_missing_fields() {
        let batch: ErrorLineBatch =
            serde_json::from_str(r#"{"lines": [{"code": "a + b", "method": "add"}]}"#).unwrap();
        assert_eq!(batch.lines.len(), 1);
        assert_eq!(batch.lines[0].lineno, 0);
        assert!(!batch.lines[0].is_located());
        assert_eq!(batch.lines[0].summary(), "add: 0");
    }
}
