//! Output formatting utilities for the CLI.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

use crate::domain::models::{OverallStatus, ToolStatus};

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate to `max_len` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Table with bold headers and dynamic column widths.
pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).add_attribute(Attribute::Bold)));
    table
}

pub fn status_cell(status: ToolStatus) -> Cell {
    let color = match status {
        ToolStatus::Pass => Color::Green,
        ToolStatus::Warn => Color::Yellow,
        ToolStatus::Fail => Color::Red,
    };
    Cell::new(status.to_string()).fg(color)
}

pub fn styled_verdict(status: OverallStatus) -> StyledObject<String> {
    let text = status.to_string();
    match status {
        OverallStatus::Approved => style(text).green().bold(),
        OverallStatus::ApprovedWithWarnings => style(text).yellow().bold(),
        OverallStatus::Rejected => style(text).red().bold(),
    }
}

/// Spinner on stderr; hidden in JSON mode so stdout stays parseable.
pub fn spinner(message: impl Into<String>, json_mode: bool) -> ProgressBar {
    if json_mode {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template(SPINNER_TEMPLATE)
            .expect("Invalid spinner template")
            .tick_chars(SPINNER_CHARS),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_table_renders_headers() {
        let mut t = table(&["Tool", "Status"]);
        t.add_row(vec![Cell::new("Synthetic Red Team"), status_cell(ToolStatus::Pass)]);
        let rendered = t.to_string();
        assert!(rendered.contains("Tool"));
        assert!(rendered.contains("PASS"));
    }
}
