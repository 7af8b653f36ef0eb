//! Test generator tools.
//!
//! Both generators share decoding (write the batch, run it through the test
//! framework, attach diagnostics positionally), validation and termination;
//! they differ in which outcomes pass and in the wording of their requests.

pub mod negative;
pub mod positive;

pub use negative::NegativeTestGenerator;
pub use positive::PositiveTestGenerator;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::domain::errors::ToolError;
use crate::domain::models::{
    DiagnosticRecord, FaultKind, GeneratedBatch, Resource, SourceFile, TestCase,
};
use crate::domain::ports::TestFramework;
use crate::services::error_line_finder::code_block;
use crate::services::model_output::parse_model_json;
use crate::services::source_index::SourceIndex;

/// Outcome bucket for tests referencing private-by-convention names.
pub const PRIVATE_ACCESS: &str = "PrivateAccessError";
const PRIVATE_ACCESS_MESSAGE: &str =
    "use public method instead of underscore-prefix named method and variable";
const SYNTAX_ERROR: &str = "SyntaxError";
const OTHER: &str = "Other";

static PRIVATE_NAME: OnceLock<Regex> = OnceLock::new();

fn private_name_pattern() -> &'static Regex {
    PRIVATE_NAME.get_or_init(|| {
        Regex::new(r"(?:= |\n|\t|\.)_[a-zA-Z0-9_]+").expect("private name pattern is valid")
    })
}

/// Whether code reaches for an underscore-prefixed attribute or name.
pub fn uses_private_names(code: &str) -> bool {
    private_name_pattern().is_match(code)
}

/// Inputs shared by every generator working on one source set.
#[derive(Clone)]
pub struct GenerationContext {
    pub index: Arc<SourceIndex>,
    pub framework: Arc<dyn TestFramework>,
    /// Files under test; the first is the one failures must be raised in.
    pub sources: Vec<SourceFile>,
    pub resources: Vec<Resource>,
    /// Directory generated batches are written to.
    pub work_dir: PathBuf,
    /// Tests requested per round.
    pub candidates: usize,
}

impl GenerationContext {
    pub fn primary_source(&self) -> Option<&SourceFile> {
        self.sources.first()
    }

    /// Info blocks quoting every source file and resource.
    pub fn info_blocks(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|source| code_block(&source.path, &source.text))
            .chain(self.resources.iter().map(|resource| {
                format!("### {}\n```python\n{}\n```", resource.title, resource.content)
            }))
            .collect()
    }
}

/// Rejected tests grouped by outcome kind, then by outcome summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackBucket {
    pub kind: String,
    /// `(summary, test names)` in first-seen order.
    pub groups: Vec<(String, Vec<String>)>,
}

impl FeedbackBucket {
    fn push(&mut self, summary: String, name: String) {
        match self.groups.iter_mut().find(|(seen, _)| *seen == summary) {
            Some((_, names)) => names.push(name),
            None => self.groups.push((summary, vec![name])),
        }
    }
}

/// Decoding, validation and termination shared by the generators.
pub struct TestGenerator {
    context: GenerationContext,
    pass_kinds: Vec<FaultKind>,
    target_function: String,
    target_count: usize,
    label: String,
    batches: Arc<AtomicUsize>,
}

impl TestGenerator {
    pub fn new(
        context: GenerationContext,
        pass_kinds: Vec<FaultKind>,
        target_function: impl Into<String>,
        target_count: usize,
        label: impl Into<String>,
    ) -> Self {
        Self {
            context,
            pass_kinds,
            target_function: target_function.into(),
            target_count,
            label: label.into().replace('.', "_"),
            batches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Share a batch counter so successive generators never overwrite each
    /// other's test files.
    #[must_use]
    pub fn with_batch_counter(mut self, batches: Arc<AtomicUsize>) -> Self {
        self.batches = batches;
        self
    }

    pub fn context(&self) -> &GenerationContext {
        &self.context
    }

    pub fn target_function(&self) -> &str {
        &self.target_function
    }

    pub fn pass_kinds(&self) -> &[FaultKind] {
        &self.pass_kinds
    }

    /// Pass kinds joined for use in a request sentence.
    pub fn pass_kinds_text(&self) -> String {
        self.pass_kinds
            .iter()
            .map(FaultKind::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Extra instruction when the target itself is private by convention.
    pub fn private_target_hint(&self) -> Option<String> {
        uses_private_names(&self.target_function).then(|| {
            format!(
                "As {} is underscore-prefixed, use public method instead.",
                self.target_function
            )
        })
    }

    /// Write the model's tests to a fresh file, run them, and attach each
    /// test's diagnostic. Tests without a diagnostic are dropped.
    pub async fn decode_batch(&self, raw: &str) -> Result<Vec<TestCase>, ToolError> {
        let batch: GeneratedBatch = parse_model_json(raw)?;
        let cases = batch.into_cases();
        if cases.is_empty() {
            return Ok(cases);
        }

        let n = self.batches.fetch_add(1, Ordering::SeqCst) + 1;
        let path = self.context.work_dir.join(format!("test_{}{n}.py", self.label));
        let body = cases
            .iter()
            .map(TestCase::to_py)
            .collect::<Vec<_>>()
            .join("\n\n");

        tokio::fs::create_dir_all(&self.context.work_dir)
            .await
            .map_err(|source| ToolError::Write {
                path: self.context.work_dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| ToolError::Write {
                path: path.clone(),
                source,
            })?;

        let diagnostics = self.context.framework.execute(&path).await;
        if diagnostics.len() != cases.len() {
            tracing::debug!(
                path = %path.display(),
                cases = cases.len(),
                diagnostics = diagnostics.len(),
                "diagnostic count differs from test count"
            );
        }

        Ok(cases
            .into_iter()
            .zip(diagnostics)
            .map(|(case, diagnostic)| case.with_result(diagnostic))
            .collect())
    }

    /// Acceptance check shared by both generators.
    pub fn accepts(&self, case: &TestCase) -> bool {
        if uses_private_names(&case.code) {
            return false;
        }
        let Some(result) = &case.result else {
            return false;
        };
        if !self.pass_kinds.contains(&result.kind) {
            return false;
        }
        if result.is_pass() {
            return true;
        }

        let target = self
            .target_function
            .rsplit('.')
            .next()
            .unwrap_or(&self.target_function);

        self.context
            .primary_source()
            .is_some_and(|primary| primary.is_reported_as(&result.path))
            && result.function == target
            && self.context.index.is_in_range(&result.function, result.lineno)
    }

    pub fn is_enough(&self, accepted: &[TestCase]) -> bool {
        accepted.len() >= self.target_count
    }

    /// Bucket rejected tests by outcome kind.
    ///
    /// Buckets come in a fixed order: the pass kinds, then `None`,
    /// `SyntaxError`, the private-access bucket and `Other`. Empty buckets
    /// are omitted.
    pub fn classify(&self, rejected: &[TestCase]) -> Vec<FeedbackBucket> {
        let mut buckets: Vec<FeedbackBucket> = Vec::new();
        let kinds = self
            .pass_kinds
            .iter()
            .map(|kind| kind.as_str().to_string())
            .chain(
                [FaultKind::PASSED, SYNTAX_ERROR, PRIVATE_ACCESS, OTHER]
                    .into_iter()
                    .map(str::to_string),
            );
        for kind in kinds {
            if !buckets.iter().any(|bucket| bucket.kind == kind) {
                buckets.push(FeedbackBucket {
                    kind,
                    groups: Vec::new(),
                });
            }
        }

        for case in rejected {
            let (kind, summary) = if uses_private_names(&case.code) {
                let rewritten =
                    DiagnosticRecord::unlocated(FaultKind::named(PRIVATE_ACCESS), PRIVATE_ACCESS_MESSAGE);
                (PRIVATE_ACCESS.to_string(), rewritten.summary())
            } else {
                let Some(result) = &case.result else {
                    continue;
                };
                let kind = result.kind.as_str();
                let kind = if buckets.iter().any(|bucket| bucket.kind == kind) {
                    kind.to_string()
                } else {
                    OTHER.to_string()
                };
                (kind, result.summary())
            };

            if let Some(bucket) = buckets.iter_mut().find(|bucket| bucket.kind == kind) {
                bucket.push(summary, case.name.clone());
            }
        }

        buckets.retain(|bucket| !bucket.groups.is_empty());
        buckets
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    pub(crate) const SOURCE: &str = "class Calc:\n    def divide(self, a, b):\n        return a / b\n\n    def _scale(self, x):\n        return x * 2\n";

    /// Framework replaying canned diagnostics and recording executed files.
    pub(crate) struct CannedFramework {
        pub(crate) results: Mutex<Vec<Vec<DiagnosticRecord>>>,
        pub(crate) executed: Mutex<Vec<PathBuf>>,
    }

    impl CannedFramework {
        pub(crate) fn new(results: Vec<Vec<DiagnosticRecord>>) -> Self {
            Self {
                results: Mutex::new(results),
                executed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TestFramework for CannedFramework {
        fn name(&self) -> &str {
            "canned"
        }

        async fn execute(&self, path: &Path) -> Vec<DiagnosticRecord> {
            self.executed.lock().unwrap().push(path.to_path_buf());
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                Vec::new()
            } else {
                results.remove(0)
            }
        }
    }

    pub(crate) fn fault_at(kind: &str, function: &str, lineno: usize) -> DiagnosticRecord {
        DiagnosticRecord {
            kind: FaultKind::named(kind),
            message: "boom".to_string(),
            path: "src/calc.py".to_string(),
            function: function.to_string(),
            code: "return a / b".to_string(),
            lineno,
        }
    }

    pub(crate) fn context(framework: Arc<dyn TestFramework>, work_dir: &Path) -> GenerationContext {
        GenerationContext {
            index: Arc::new(SourceIndex::from_source(SOURCE).unwrap()),
            framework,
            sources: vec![SourceFile::new("src/calc.py", SOURCE)],
            resources: vec![Resource::new("notes", "divide expects numbers")],
            work_dir: work_dir.to_path_buf(),
            candidates: 3,
        }
    }

    fn generator(pass: &str) -> TestGenerator {
        let framework = Arc::new(CannedFramework::new(Vec::new()));
        TestGenerator::new(
            context(framework, Path::new("unused")),
            vec![FaultKind::named(pass)],
            "Calc.divide",
            2,
            "Calc.divide_neg",
        )
    }

    #[test]
    fn test_private_name_pattern() {
        assert!(uses_private_names("    calc._scale(2)"));
        assert!(uses_private_names("x = _hidden"));
        assert!(!uses_private_names("    calc.scale(2)"));
        assert!(uses_private_names("Calc._scale"));
        assert!(!uses_private_names("_scale"));
    }

    #[test]
    fn test_accepts_located_fault() {
        let generator = generator("ZeroDivisionError");
        let case = TestCase::new("t", "    Calc().divide(1, 0)")
            .with_result(fault_at("ZeroDivisionError", "divide", 3));
        assert!(generator.accepts(&case));
    }

    #[test]
    fn test_rejects_fault_elsewhere() {
        let generator = generator("ZeroDivisionError");

        let wrong_function = TestCase::new("t", "    a()")
            .with_result(fault_at("ZeroDivisionError", "helper", 3));
        let out_of_range = TestCase::new("t", "    b()")
            .with_result(fault_at("ZeroDivisionError", "divide", 40));
        let mut wrong_path = fault_at("ZeroDivisionError", "divide", 3);
        wrong_path.path = "test/test_x.py".to_string();
        let wrong_path = TestCase::new("t", "    c()").with_result(wrong_path);
        let wrong_kind = TestCase::new("t", "    d()").with_result(fault_at("TypeError", "divide", 3));
        let private = TestCase::new("t", "    e = Calc()\n    e._scale(1)")
            .with_result(fault_at("ZeroDivisionError", "divide", 3));
        let unrun = TestCase::new("t", "    f()");

        for case in [wrong_function, out_of_range, wrong_path, wrong_kind, private, unrun] {
            assert!(!generator.accepts(&case), "{case}");
        }
    }

    #[test]
    fn test_passing_outcome_skips_location_checks() {
        let generator = generator("None");
        let case = TestCase::new("t", "    assert Calc().divide(4, 2) == 2")
            .with_result(DiagnosticRecord::passed());
        assert!(generator.accepts(&case));
    }

    #[test]
    fn test_classify_groups_by_kind_and_summary() {
        let generator = generator("ZeroDivisionError");
        let rejected = vec![
            TestCase::new("test_a", "    a()").with_result(DiagnosticRecord::passed()),
            TestCase::new("test_b", "    b()").with_result(fault_at("KeyError", "divide", 3)),
            TestCase::new("test_c", "    c()").with_result(fault_at("KeyError", "divide", 3)),
            TestCase::new("test_d", "    x = Calc()._scale(1)").with_result(DiagnosticRecord::passed()),
            TestCase::new("test_e", "    e()")
                .with_result(fault_at("ZeroDivisionError", "helper", 9)),
        ];

        let buckets = generator.classify(&rejected);
        let kinds: Vec<&str> = buckets.iter().map(|b| b.kind.as_str()).collect();
        assert_eq!(kinds, vec!["ZeroDivisionError", "None", PRIVATE_ACCESS, "Other"]);

        let other = &buckets[3];
        assert_eq!(
            other.groups,
            vec![(
                "KeyError: boom".to_string(),
                vec!["test_b".to_string(), "test_c".to_string()]
            )]
        );
        assert_eq!(buckets[2].groups[0].0, format!("{PRIVATE_ACCESS}: {PRIVATE_ACCESS_MESSAGE}"));
    }

    #[tokio::test]
    async fn test_decode_batch_runs_tests_and_attaches_results() {
        let dir = tempfile::tempdir().unwrap();
        let framework = Arc::new(CannedFramework::new(vec![vec![
            fault_at("ZeroDivisionError", "divide", 3),
            DiagnosticRecord::passed(),
        ]]));
        let generator = TestGenerator::new(
            context(framework.clone(), dir.path()),
            vec![FaultKind::named("ZeroDivisionError")],
            "Calc.divide",
            2,
            "Calc.divide_neg",
        );

        let raw = r#"{"codes": [
            {"name": "test_zero", "code": "def test_zero():\n    Calc().divide(1, 0)"},
            {"name": "test_ok", "code": "    assert Calc().divide(2, 1) == 2"},
            {"name": "test_extra", "code": "    pass"}
        ]}"#;
        let cases = generator.decode_batch(raw).await.unwrap();

        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].name, "test_zero");
        assert!(cases[0].result.as_ref().is_some_and(|r| !r.is_pass()));

        let executed = framework.executed.lock().unwrap().clone();
        assert_eq!(executed, vec![dir.path().join("test_Calc_divide_neg1.py")]);
        let written = std::fs::read_to_string(&executed[0]).unwrap();
        assert!(written.starts_with("def test_zero():\n    Calc().divide(1, 0)\n\ndef test_ok():"));
    }

    #[tokio::test]
    async fn test_decode_batch_rejects_non_json() {
        let generator = generator("TypeError");
        assert!(generator.decode_batch("sorry, no tests").await.is_err());
        assert!(generator.decode_batch(r#"{"codes": []}"#).await.unwrap().is_empty());
    }
}
