//! Output formatting utilities for the CLI.

use std::env;
use std::time::Duration;

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;

use crate::domain::models::DiagnosticRecord;

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to a maximum number of characters, appending "..." if
/// truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Spinner for long model round trips. Hidden in JSON mode so stdout and
/// stderr stay clean for machines.
pub fn create_spinner(message: impl Into<String>, json_mode: bool) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if json_mode {
        spinner.set_draw_target(ProgressDrawTarget::hidden());
        return spinner;
    }

    if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        spinner.set_style(style.tick_chars(SPINNER_CHARS));
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Respect `NO_COLOR` and dumb terminals.
pub fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

pub fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(label).add_attribute(Attribute::Bold))
        .collect()
}

/// One row per diagnostic: test index, outcome, location and message.
pub fn diagnostics_table(diagnostics: &[DiagnosticRecord]) -> String {
    let use_colors = supports_color();
    let mut table = base_table();
    table.set_header(header(&["#", "Outcome", "Location", "Line", "Message"]));

    for (i, diagnostic) in diagnostics.iter().enumerate() {
        let outcome = diagnostic.kind.to_string();
        let outcome_cell = match (use_colors, diagnostic.is_pass()) {
            (true, true) => Cell::new(outcome).fg(Color::Green),
            (true, false) => Cell::new(outcome).fg(Color::Red),
            (false, _) => Cell::new(outcome),
        };
        let location = if diagnostic.path.is_empty() {
            "-".to_string()
        } else {
            format!("{}: {}", diagnostic.path, diagnostic.function)
        };
        let line = if diagnostic.lineno == 0 {
            "-".to_string()
        } else {
            diagnostic.lineno.to_string()
        };

        table.add_row(vec![
            Cell::new(i + 1),
            outcome_cell,
            Cell::new(location),
            Cell::new(line),
            Cell::new(truncate(&diagnostic.message, 60)),
        ]);
    }

    table.to_string()
}
