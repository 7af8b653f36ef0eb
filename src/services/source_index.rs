//! Source position resolver.
//!
//! Indexes every function and method of a Python file as a set of
//! reconstructed statements, so a fuzzy `(unit, fragment, hint line)` triple
//! quoted by a model can be resolved to an exact line.
//!
//! Units are discovered with tree-sitter. A class pushes its name on the
//! qualifier stack (`Outer.Inner.method`); a function is recorded and its body
//! is not descended into, so nested functions are not units. A decorated
//! definition's span starts at its first decorator.
//!
//! Statements are keyed by their 0-based offset from the unit's first line:
//! `start_line + offset` is the absolute line of the statement's first
//! contributing raw line.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::{debug, warn};
use tree_sitter::{Node, Parser};

use crate::domain::errors::{SourceIndexError, SourceIndexResult};

thread_local! {
    static PYTHON_PARSER: RefCell<Option<Parser>> = RefCell::new({
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .ok()
            .map(|()| parser)
    });
}

const OPEN_BRACKETS: [char; 3] = ['(', '[', '{'];
const CLOSE_BRACKETS: [char; 3] = [')', ']', '}'];

/// One indexed function or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpan {
    name: String,
    start_line: usize,
    end_line: usize,
    statements: BTreeMap<usize, String>,
}

impl UnitSpan {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First line of the span, 1-based.
    pub const fn start_line(&self) -> usize {
        self.start_line
    }

    /// Last line of the span, inclusive.
    pub const fn end_line(&self) -> usize {
        self.end_line
    }

    pub const fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Statements as `(absolute line, text)` in source order.
    pub fn statements(&self) -> impl Iterator<Item = (usize, &str)> {
        self.statements
            .iter()
            .map(|(offset, text)| (self.start_line + offset, text.as_str()))
    }

    /// Statements as `(relative offset, text)` in source order.
    pub fn offsets(&self) -> impl Iterator<Item = (usize, &str)> {
        self.statements
            .iter()
            .map(|(offset, text)| (*offset, text.as_str()))
    }
}

/// Read-only index of a source file's units, shared across engine runs.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    units: Vec<UnitSpan>,
    by_name: HashMap<String, usize>,
}

impl SourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a Python file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> SourceIndexResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SourceIndexError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(&source)
    }

    /// Index Python source text.
    ///
    /// Sources with syntax errors are indexed from whatever definitions the
    /// parser recovers.
    pub fn from_source(source: &str) -> SourceIndexResult<Self> {
        let tree = PYTHON_PARSER.with(|cell| {
            let mut slot = cell.borrow_mut();
            let parser = slot.as_mut().ok_or_else(|| {
                SourceIndexError::Grammar("tree-sitter-python language rejected".to_string())
            })?;
            parser
                .parse(source, None)
                .ok_or_else(|| SourceIndexError::Parse("parser returned no tree".to_string()))
        })?;

        let root = tree.root_node();
        if root.has_error() {
            warn!("source has syntax errors; indexing recovered definitions only");
        }

        let lines: Vec<&str> = source.lines().collect();
        let mut spans = Vec::new();
        collect_units(root, source.as_bytes(), &mut Vec::new(), &mut spans);

        let mut index = Self::new();
        for (name, start, end) in spans {
            let last = end.min(lines.len());
            if start == 0 || start > last {
                continue;
            }
            index.index_unit(name, start, &lines[start - 1..last]);
        }

        debug!(units = index.len(), "source indexed");
        Ok(index)
    }

    /// Add (or replace) a unit from its raw lines and absolute first line.
    pub fn index_unit(&mut self, name: impl Into<String>, start_line: usize, raw_lines: &[&str]) {
        let name = name.into();
        let span = UnitSpan {
            name: name.clone(),
            start_line,
            end_line: start_line + raw_lines.len().saturating_sub(1),
            statements: reconstruct_statements(raw_lines),
        };

        if let Some(&slot) = self.by_name.get(&name) {
            self.units[slot] = span;
        } else {
            self.by_name.insert(name, self.units.len());
            self.units.push(span);
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Indexed unit names in source order.
    pub fn unit_names(&self) -> Vec<&str> {
        self.units.iter().map(UnitSpan::name).collect()
    }

    pub fn unit(&self, name: &str) -> Option<&UnitSpan> {
        self.by_name.get(name).map(|&slot| &self.units[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Statement texts of a unit; empty when the unit is unknown.
    pub fn statements(&self, name: &str) -> Vec<&str> {
        self.unit(name)
            .map(|unit| unit.offsets().map(|(_, text)| text).collect())
            .unwrap_or_default()
    }

    /// Resolve a quoted fragment of `unit` to an absolute line.
    ///
    /// Among statements containing `fragment`, picks the one minimizing the
    /// signed difference `line - hint_line`; the earliest statement wins ties.
    pub fn find(&self, unit: &str, fragment: &str, hint_line: i64) -> Option<usize> {
        let Some(span) = self.unit(unit) else {
            debug!(unit, "location unresolved: unknown unit");
            return None;
        };

        let mut best: Option<(i64, usize)> = None;
        for (line, text) in span.statements() {
            if !quotes(text, fragment) {
                continue;
            }
            let distance = i64::try_from(line)
                .unwrap_or(i64::MAX)
                .saturating_sub(hint_line);
            if best.map_or(true, |(closest, _)| distance < closest) {
                best = Some((distance, line));
            }
        }

        if best.is_none() {
            debug!(unit, fragment, "location unresolved: no matching statement");
        }
        best.map(|(_, line)| line)
    }

    /// Whether any unit whose name ends with `suffix` spans `line`.
    pub fn is_in_range(&self, suffix: &str, line: usize) -> bool {
        self.units
            .iter()
            .filter(|unit| unit.name.ends_with(suffix))
            .any(|unit| unit.contains_line(line))
    }
}

/// Walk `node`'s children, recording `(qualified name, start, end)` per unit.
fn collect_units(
    node: Node<'_>,
    source: &[u8],
    scope: &mut Vec<String>,
    out: &mut Vec<(String, usize, usize)>,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        visit_definition(child, child, source, scope, out);
    }
}

fn visit_definition(
    node: Node<'_>,
    span: Node<'_>,
    source: &[u8],
    scope: &mut Vec<String>,
    out: &mut Vec<(String, usize, usize)>,
) {
    match node.kind() {
        "decorated_definition" => {
            if let Some(definition) = node.child_by_field_name("definition") {
                visit_definition(definition, span, source, scope, out);
            }
        }
        "class_definition" => {
            let Some(name) = node_name(node, source) else {
                return;
            };
            scope.push(name);
            if let Some(body) = node.child_by_field_name("body") {
                collect_units(body, source, scope, out);
            }
            scope.pop();
        }
        "function_definition" => {
            let Some(name) = node_name(node, source) else {
                return;
            };
            let qualified = if scope.is_empty() {
                name
            } else {
                format!("{}.{name}", scope.join("."))
            };
            out.push((qualified, span.start_position().row + 1, last_line(node)));
        }
        _ => collect_units(node, source, scope, out),
    }
}

fn node_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    node.child_by_field_name("name")?
        .utf8_text(source)
        .ok()
        .map(str::to_string)
}

/// Last 1-based line a node covers, ignoring a trailing line break.
fn last_line(node: Node<'_>) -> usize {
    let start = node.start_position();
    let end = node.end_position();
    if end.column == 0 && end.row > start.row {
        end.row
    } else {
        end.row + 1
    }
}

/// Merge a unit's raw lines into bracket-balanced statements keyed by the
/// 0-based offset of their first non-blank line.
///
/// An unbalanced tail is dropped.
pub fn reconstruct_statements(raw_lines: &[&str]) -> BTreeMap<usize, String> {
    let mut statements = BTreeMap::new();
    let mut buffer = String::new();
    let mut first: Option<usize> = None;

    for (offset, raw) in raw_lines.iter().enumerate() {
        let decoded = decode_escapes(raw);
        let clean = decoded.trim();
        if clean.is_empty() {
            continue;
        }

        let start = *first.get_or_insert(offset);
        buffer = join_fragments(&buffer, clean);
        if !brackets_balanced(&buffer) {
            continue;
        }

        statements.insert(start, std::mem::take(&mut buffer));
        first = None;
    }

    statements
}

/// Join two fragments of one statement.
///
/// No separator goes in when the left side is empty, ends with an opening
/// bracket or a comma, or the right side starts with a closing bracket.
pub fn join_fragments(left: &str, right: &str) -> String {
    let tight = left.is_empty()
        || left.ends_with(OPEN_BRACKETS)
        || left.ends_with(',')
        || right.starts_with(CLOSE_BRACKETS);
    if tight {
        format!("{left}{right}")
    } else {
        format!("{left} {right}")
    }
}

/// Whether `statement` contains `fragment`, ignoring spacing after commas.
///
/// Wrapped arguments are joined tightly (`foo(1,` + `2)` is `foo(1,2)`), so a
/// quote written as `foo(1, 2)` still matches.
pub fn quotes(statement: &str, fragment: &str) -> bool {
    statement.contains(fragment) || compact_commas(statement).contains(&compact_commas(fragment))
}

fn compact_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut after_comma = false;
    for c in text.chars() {
        if after_comma && c.is_whitespace() {
            continue;
        }
        after_comma = c == ',';
        out.push(c);
    }
    out
}

/// Whether the total count of opening brackets equals the total of closing ones.
pub fn brackets_balanced(text: &str) -> bool {
    let opened = text.chars().filter(|c| OPEN_BRACKETS.contains(c)).count();
    let closed = text.chars().filter(|c| CLOSE_BRACKETS.contains(c)).count();
    opened == closed
}

/// Resolve Python-style backslash escapes. Unknown sequences are kept verbatim.
pub fn decode_escapes(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(&next) = chars.peek() else {
            out.push('\\');
            break;
        };

        let simple = match next {
            '\\' | '\'' | '"' => Some(next),
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            'a' => Some('\u{07}'),
            'b' => Some('\u{08}'),
            'f' => Some('\u{0c}'),
            'v' => Some('\u{0b}'),
            _ => None,
        };
        if let Some(decoded) = simple {
            chars.next();
            out.push(decoded);
            continue;
        }

        let decoded = match next {
            '0'..='7' => take_code_point(&mut chars, 0, 3, 8),
            'x' => take_code_point(&mut chars, 1, 2, 16),
            'u' => take_code_point(&mut chars, 1, 4, 16),
            'U' => take_code_point(&mut chars, 1, 8, 16),
            _ => None,
        };
        match decoded {
            Some(decoded) => out.push(decoded),
            None => out.push('\\'),
        }
    }

    out
}

/// Consume `skip` marker chars then the digits of an escape, if they form a
/// valid code point. Octal escapes take up to `width` digits, hex escapes
/// exactly `width`.
fn take_code_point(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    skip: usize,
    width: usize,
    radix: u32,
) -> Option<char> {
    let mut lookahead = chars.clone();
    for _ in 0..skip {
        lookahead.next();
    }

    let mut digits = String::new();
    while digits.len() < width {
        match lookahead.peek() {
            Some(c) if c.is_digit(radix) => {
                digits.push(*c);
                lookahead.next();
            }
            _ => break,
        }
    }

    if digits.is_empty() || (radix == 16 && digits.len() != width) {
        return None;
    }

    let decoded = u32::from_str_radix(&digits, radix)
        .ok()
        .and_then(char::from_u32)?;
    *chars = lookahead;
    Some(decoded)
}
