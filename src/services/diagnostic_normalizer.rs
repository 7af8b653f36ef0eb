//! Pytest report normalization.
//!
//! Converts a `pytest-json-report` document into one [`DiagnosticRecord`] per
//! executed test, in report order. A report whose exit code says the run never
//! got to execute tests (collection or interpreter failure) yields a single
//! record built from the last collector failure.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::models::{DiagnosticRecord, FaultKind};

/// Separator pytest draws between traceback entries in long mode.
const FRAME_SEPARATOR: &str = "_ _ _";

/// Marker of a definition line inside a rendered traceback.
const DEF_KEYWORD: &str = "def ";

/// Pytest exit codes above this mean no test ran to completion.
const LAST_RUN_EXIT_CODE: i64 = 1;

#[derive(Debug, Deserialize)]
struct PytestReport {
    #[serde(default = "unrecoverable_exit_code")]
    exitcode: i64,
    #[serde(default)]
    collectors: Vec<Collector>,
    #[serde(default)]
    tests: Vec<TestEntry>,
}

const fn unrecoverable_exit_code() -> i64 {
    2
}

#[derive(Debug, Deserialize)]
struct Collector {
    #[serde(default)]
    longrepr: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TestEntry {
    #[serde(default)]
    nodeid: String,
    #[serde(default)]
    setup: Option<Stage>,
    #[serde(default)]
    call: Option<Stage>,
}

#[derive(Debug, Deserialize)]
struct Stage {
    #[serde(default)]
    outcome: String,
    #[serde(default)]
    crash: Option<Crash>,
    #[serde(default)]
    longrepr: Option<String>,
    #[serde(default)]
    traceback: Vec<TracebackEntry>,
}

#[derive(Debug, Deserialize)]
struct Crash {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TracebackEntry {
    #[serde(default)]
    path: String,
}

/// Turns framework reports into diagnostic records.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticNormalizer;

impl DiagnosticNormalizer {
    /// Normalize a report given as JSON text. Malformed input yields no records.
    pub fn normalize_str(raw: &str) -> Vec<DiagnosticRecord> {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::normalize(&value),
            Err(e) => {
                warn!(error = %e, "pytest report is not valid JSON");
                Vec::new()
            }
        }
    }

    /// Normalize a parsed report. Documents of the wrong shape yield no records.
    pub fn normalize(report: &Value) -> Vec<DiagnosticRecord> {
        let report = match PytestReport::deserialize(report) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "pytest report has an unexpected shape");
                return Vec::new();
            }
        };

        if report.exitcode > LAST_RUN_EXIT_CODE {
            return unrecoverable_run(&report.collectors).into_iter().collect();
        }

        report.tests.iter().map(normalize_test).collect()
    }
}

fn unrecoverable_run(collectors: &[Collector]) -> Option<DiagnosticRecord> {
    let Some(rendering) = collectors
        .iter()
        .rev()
        .filter_map(|collector| collector.longrepr.as_deref())
        .find(|longrepr| !longrepr.trim().is_empty())
    else {
        warn!("pytest run failed without a collector report");
        return None;
    };

    let last_line = rendering.trim_end().lines().last().unwrap_or_default();
    let line = strip_fault_marker(last_line);
    let (kind, message) = split_kind(line);
    debug!(kind, "pytest run did not execute tests");

    Some(DiagnosticRecord::unlocated(FaultKind::named(kind), message))
}

fn normalize_test(test: &TestEntry) -> DiagnosticRecord {
    let Some(stage) = test.call.as_ref().or(test.setup.as_ref()) else {
        return DiagnosticRecord::passed();
    };
    if stage.outcome != "failed" {
        return DiagnosticRecord::passed();
    }

    let crash_message = stage
        .crash
        .as_ref()
        .map(|crash| crash.message.as_str())
        .unwrap_or_default();
    let (kind, message) = split_kind(crash_message);
    let path = stage
        .traceback
        .last()
        .map(|entry| entry.path.clone())
        .unwrap_or_default();
    let rendering = stage.longrepr.as_deref().unwrap_or_default();
    let lines: Vec<&str> = rendering.split('\n').collect();

    let record = DiagnosticRecord {
        kind: FaultKind::named(kind),
        message: message.to_string(),
        path,
        function: enclosing_unit(&lines),
        code: offending_line(&lines),
        lineno: reported_line_number(&lines),
    };
    debug!(test = %test.nodeid, summary = %record.summary(), "test failed");
    record
}

/// Split `Kind: message` on the first `": "`; without one the whole text is the kind.
fn split_kind(text: &str) -> (&str, &str) {
    text.split_once(": ").unwrap_or((text, ""))
}

/// Drop pytest's leading `E` marker and the whitespace after it.
fn strip_fault_marker(line: &str) -> &str {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix('E') {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => trimmed,
    }
}

/// Name of the function the failure was raised in.
///
/// The rendering is split into traceback entries at separator lines; entries
/// are searched from the innermost outward and the last definition line of the
/// first entry holding one names the function.
fn enclosing_unit(lines: &[&str]) -> String {
    let mut bounds = vec![0];
    bounds.extend(
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains(FRAME_SEPARATOR))
            .map(|(i, _)| i),
    );
    bounds.push(lines.len().saturating_sub(1));

    for pair in bounds.windows(2).rev() {
        let (start, end) = (pair[0], pair[1]);
        if start >= end {
            continue;
        }
        let name = lines[start..end]
            .iter()
            .filter_map(|line| line.split_once(DEF_KEYWORD))
            .map(|(_, rest)| rest.split('(').next().unwrap_or_default())
            .last();
        if let Some(name) = name.filter(|name| !name.is_empty()) {
            return name.to_string();
        }
    }

    String::new()
}

/// The `>`-marked source line closest to the end, ignoring the trailing
/// error, blank and location lines.
fn offending_line(lines: &[&str]) -> String {
    let Some(last_candidate) = lines.len().checked_sub(4) else {
        return String::new();
    };

    lines[..=last_candidate]
        .iter()
        .rev()
        .find_map(|line| line.strip_prefix('>'))
        .map(|code| code.trim().to_string())
        .unwrap_or_default()
}

/// Line number from the final `path:line: Kind` location line.
fn reported_line_number(lines: &[&str]) -> usize {
    let Some(location) = lines.last() else {
        return 0;
    };

    let mut fields = location.split(':').map(str::trim);
    if let Some(lineno) = fields.nth(1).and_then(|field| field.parse().ok()) {
        return lineno;
    }

    location
        .split(':')
        .find_map(|field| field.trim().parse().ok())
        .unwrap_or(0)
}
