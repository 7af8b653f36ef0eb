use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome category of a single test case.
///
/// Serialized as the bare exception name, with `"None"` meaning the test passed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FaultKind {
    Passed,
    Fault(String),
}

impl FaultKind {
    /// Wire name of the passing outcome.
    pub const PASSED: &'static str = "None";

    pub fn named(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Passed => Self::PASSED,
            Self::Fault(name) => name,
        }
    }
}

impl From<String> for FaultKind {
    fn from(name: String) -> Self {
        if name == Self::PASSED {
            Self::Passed
        } else {
            Self::Fault(name)
        }
    }
}

impl From<&str> for FaultKind {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<FaultKind> for String {
    fn from(kind: FaultKind) -> Self {
        match kind {
            FaultKind::Passed => FaultKind::PASSED.to_string(),
            FaultKind::Fault(name) => name,
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized outcome of one test case from a framework run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    #[serde(rename = "type")]
    pub kind: FaultKind,
    #[serde(default)]
    pub message: String,
    /// File the failure was raised in, as reported by the framework.
    #[serde(default)]
    pub path: String,
    /// Innermost function of the failure, unqualified.
    #[serde(default)]
    pub function: String,
    /// Offending source line, trimmed.
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub lineno: usize,
}

impl DiagnosticRecord {
    /// Record for a test that passed.
    pub fn passed() -> Self {
        Self {
            kind: FaultKind::Passed,
            message: String::new(),
            path: String::new(),
            function: String::new(),
            code: String::new(),
            lineno: 0,
        }
    }

    /// Record for a failure with no location, such as a collection error.
    pub fn unlocated(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            ..Self::passed()
        }
    }

    pub const fn is_pass(&self) -> bool {
        !self.kind.is_fault()
    }

    /// Short description used to group feedback: `passed`, `Kind: message` or `Kind`.
    pub fn summary(&self) -> String {
        if self.is_pass() {
            "passed".to_string()
        } else if self.message.is_empty() {
            self.kind.to_string()
        } else {
            format!("{}: {}", self.kind, self.message)
        }
    }
}

impl Default for DiagnosticRecord {
    fn default() -> Self {
        Self::passed()
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pass() {
            write!(f, "- no error")
        } else {
            write!(
                f,
                "- {}: {}: {}\n  {}",
                self.path,
                self.function,
                self.code,
                self.summary()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_kind_round_trips_none() {
        assert_eq!(FaultKind::named("None"), FaultKind::Passed);
        assert_eq!(
            FaultKind::named("TypeError"),
            FaultKind::Fault("TypeError".to_string())
        );

        let json = serde_json::to_string(&FaultKind::Passed).unwrap();
        assert_eq!(json, "\"None\"");
    }

    #[test]
    fn test_summary_variants() {
        assert_eq!(DiagnosticRecord::passed().summary(), "passed");

        let bare = DiagnosticRecord::unlocated(FaultKind::named("SyntaxError"), "");
        assert_eq!(bare.summary(), "SyntaxError");

        let full = DiagnosticRecord::unlocated(FaultKind::named("TypeError"), "bad operand");
        assert_eq!(full.summary(), "TypeError: bad operand");
    }

    #[test]
    fn test_display_includes_location() {
        let record = DiagnosticRecord {
            kind: FaultKind::named("ZeroDivisionError"),
            message: "division by zero".to_string(),
            path: "src/calc.py".to_string(),
            function: "divide".to_string(),
            code: "return a / b".to_string(),
            lineno: 4,
        };

        assert_eq!(
            record.to_string(),
            "- src/calc.py: divide: return a / b\n  ZeroDivisionError: division by zero"
        );
        assert_eq!(DiagnosticRecord::passed().to_string(), "- no error");
    }

    #[test]
    fn test_serializes_kind_as_type() {
        let record = DiagnosticRecord::unlocated(FaultKind::named("KeyError"), "'k'");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "KeyError");
        assert_eq!(value["lineno"], 0);
    }
}
