//! Integration tests for pytest report normalization.

use serde_json::json;

use faultline::domain::models::FaultKind;
use faultline::services::DiagnosticNormalizer;

const TYPE_ERROR_LONGREPR: &str = "def test_neg_1():
>       Calc().divide('1', 2)

test/test_Calc_divide_neg1.py:4:
_ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _ _

self = <calc.Calc object at 0x7f>, a = '1', b = 2

    def divide(self, a, b):
>       return a / b
E       TypeError: unsupported operand type(s) for /: 'str' and 'int'

src/calc.py:3: TypeError";

fn report() -> serde_json::Value {
    json!({
        "created": 1_700_000_000.0,
        "duration": 0.05,
        "exitcode": 1,
        "root": "/work",
        "summary": {"passed": 1, "failed": 1, "total": 2, "collected": 2},
        "collectors": [],
        "tests": [
            {
                "nodeid": "test/test_Calc_divide_neg1.py::test_neg_1",
                "lineno": 3,
                "outcome": "failed",
                "setup": {"duration": 0.001, "outcome": "passed"},
                "call": {
                    "duration": 0.002,
                    "outcome": "failed",
                    "crash": {
                        "path": "/work/src/calc.py",
                        "lineno": 3,
                        "message": "TypeError: unsupported operand type(s) for /: 'str' and 'int'"
                    },
                    "traceback": [
                        {"path": "test/test_Calc_divide_neg1.py", "lineno": 4, "message": ""},
                        {"path": "src/calc.py", "lineno": 3, "message": "TypeError"}
                    ],
                    "longrepr": TYPE_ERROR_LONGREPR
                },
                "teardown": {"duration": 0.001, "outcome": "passed"}
            },
            {
                "nodeid": "test/test_Calc_divide_neg1.py::test_neg_2",
                "lineno": 6,
                "outcome": "passed",
                "setup": {"outcome": "passed"},
                "call": {"outcome": "passed"},
                "teardown": {"outcome": "passed"}
            }
        ]
    })
}

#[test]
fn test_report_yields_one_record_per_test_in_order() {
    let records = DiagnosticNormalizer::normalize(&report());

    assert_eq!(records.len(), 2);

    let failure = &records[0];
    assert_eq!(failure.kind, FaultKind::named("TypeError"));
    assert_eq!(failure.message, "unsupported operand type(s) for /: 'str' and 'int'");
    assert_eq!(failure.path, "src/calc.py");
    assert_eq!(failure.function, "divide");
    assert_eq!(failure.code, "return a / b");
    assert_eq!(failure.lineno, 3);

    assert!(records[1].is_pass());
    assert_eq!(records[1].kind, FaultKind::Passed);
}

#[test]
fn test_text_and_value_inputs_agree() {
    let text = serde_json::to_string(&report()).unwrap();
    assert_eq!(
        DiagnosticNormalizer::normalize_str(&text),
        DiagnosticNormalizer::normalize(&report())
    );
}

#[test]
fn test_collection_failure_becomes_single_unlocated_record() {
    let report = json!({
        "exitcode": 2,
        "collectors": [
            {"nodeid": "", "outcome": "passed", "result": []},
            {
                "nodeid": "test/test_Calc_divide_neg1.py",
                "outcome": "failed",
                "result": [],
                "longrepr": "ImportError while importing test module.\nTraceback:\n  ...\nE   ModuleNotFoundError: No module named 'calc'"
            }
        ],
        "tests": []
    });

    let records = DiagnosticNormalizer::normalize(&report);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, FaultKind::named("ModuleNotFoundError"));
    assert_eq!(records[0].message, "No module named 'calc'");
    assert!(records[0].path.is_empty());
    assert_eq!(records[0].lineno, 0);
}

#[test]
fn test_syntax_error_in_generated_file() {
    let report = json!({
        "exitcode": 2,
        "collectors": [{
            "nodeid": "test/test_x.py",
            "outcome": "failed",
            "longrepr": "  File \"test/test_x.py\", line 3\n    Calc().divide(1,\n                    ^\nE   SyntaxError: '(' was never closed"
        }],
        "tests": []
    });

    let records = DiagnosticNormalizer::normalize(&report);

    assert_eq!(records[0].kind, FaultKind::named("SyntaxError"));
    assert_eq!(records[0].summary(), "SyntaxError: '(' was never closed");
}

#[test]
fn test_malformed_reports_yield_nothing() {
    assert!(DiagnosticNormalizer::normalize_str("").is_empty());
    assert!(DiagnosticNormalizer::normalize_str("{not json").is_empty());
    assert!(DiagnosticNormalizer::normalize(&json!(["a", "b"])).is_empty());
    assert!(DiagnosticNormalizer::normalize(&json!({"exitcode": 1, "tests": "nope"})).is_empty());
}
