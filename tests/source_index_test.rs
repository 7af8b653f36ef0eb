//! Integration tests for the source index: statement reconstruction, fuzzy
//! lookup and range queries, driven through the public API.

mod common;

use proptest::prelude::*;

use faultline::services::source_index::{brackets_balanced, join_fragments, reconstruct_statements};
use faultline::services::SourceIndex;

/// Unit `foo` on lines 10..=14 with `x = bar(1, 2)` on line 12.
fn foo_index() -> SourceIndex {
    let mut index = SourceIndex::new();
    index.index_unit(
        "foo",
        10,
        &["def foo():", "    y = 0", "    x = bar(1, 2)", "", "    return x"],
    );
    index
}

#[test]
fn test_find_resolves_fragment_to_absolute_line() {
    let index = foo_index();

    assert_eq!(index.find("foo", "bar(1,", 11), Some(12));
    assert_eq!(index.find("missing", "bar(1,", 11), None);
    assert_eq!(index.find("foo", "baz(", 11), None);
}

#[test]
fn test_range_is_inclusive() {
    let index = foo_index();

    assert!(index.is_in_range("foo", 10));
    assert!(index.is_in_range("foo", 14));
    assert!(!index.is_in_range("foo", 9));
    assert!(!index.is_in_range("foo", 15));
}

#[test]
fn test_wrapped_statements_collapse() {
    let statements = reconstruct_statements(&["foo(1,", "2)"]);
    assert_eq!(statements.values().collect::<Vec<_>>(), vec!["foo(1,2)"]);

    assert_eq!(join_fragments("a", "+ b"), "a + b");
    assert_eq!(join_fragments("foo(1,", "2)"), "foo(1,2)");
}

#[test]
fn test_wrapped_arguments_match_either_spacing() {
    let mut index = SourceIndex::new();
    index.index_unit(
        "f",
        10,
        &["def f():", "    x = bar(1,", "        2)", "    return x"],
    );

    assert_eq!(index.statements("f")[1], "x = bar(1,2)");
    assert_eq!(index.find("f", "bar(1, 2)", 11), Some(11));
    assert_eq!(index.find("f", "bar(1,2)", 11), Some(11));
    assert_eq!(index.find("f", "bar(1, 3)", 11), None);
}

#[test]
fn test_parsed_module_units() {
    let index = SourceIndex::from_source(common::CALC_SOURCE).unwrap();

    assert_eq!(index.unit_names(), vec!["Calc.divide", "Calc.total"]);
    assert_eq!(index.find("Calc.divide", "a / b", 1), Some(3));
    // The wrapped `sum(` call resolves to its first line.
    assert_eq!(index.find("Calc.total", "sum(values,)", 1), Some(6));
    assert_eq!(
        index.statements("Calc.total"),
        vec!["def total(self, values):", "result = sum(values,)", "return result"]
    );
    assert!(index.is_in_range("total", 9));
    assert!(!index.is_in_range("divide", 5));
}

#[test]
fn test_find_prefers_signed_closest_statement() {
    let mut index = SourceIndex::new();
    index.index_unit(
        "f",
        1,
        &["def f(a):", "    g(a)", "    h()", "    g(a)", "    return a"],
    );

    // Lines 2 and 4 both match; the smaller signed difference wins.
    assert_eq!(index.find("f", "g(a)", 4), Some(2));
    assert_eq!(index.find("f", "g(a)", 100), Some(2));
}

proptest! {
    #[test]
    fn prop_reconstructed_statements_are_balanced(
        lines in prop::collection::vec("[a-z ]{0,6}[(\\[{]?[a-z, ]{0,6}[)\\]}]?", 0..12)
    ) {
        let raw: Vec<&str> = lines.iter().map(String::as_str).collect();
        for (offset, statement) in reconstruct_statements(&raw) {
            prop_assert!(offset < raw.len());
            prop_assert!(brackets_balanced(&statement));
            prop_assert!(!raw[offset].trim().is_empty());
        }
    }

    #[test]
    fn prop_found_lines_lie_inside_the_unit(
        start in 1usize..500,
        body in prop::collection::vec("[a-z]{1,8} = [a-z]{1,8}", 1..10),
        hint in -50i64..600,
    ) {
        let mut raw = vec!["def unit():".to_string()];
        raw.extend(body.iter().map(|line| format!("    {line}")));
        let raw: Vec<&str> = raw.iter().map(String::as_str).collect();

        let mut index = SourceIndex::new();
        index.index_unit("unit", start, &raw);

        let line = index.find("unit", &body[0], hint);
        prop_assert!(line.is_some());
        let line = line.unwrap_or_default();
        prop_assert!(index.is_in_range("unit", line));
    }
}
