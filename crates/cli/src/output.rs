//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use evalstore::LifecycleState;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format an optional score, `-` when unavailable
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(value) if value.is_finite() => format!("{:.4}", value),
        Some(_) => "NaN".to_string(),
        None => "-".to_string(),
    }
}

/// Format a millisecond duration, `-` for unset (negative) times
pub fn format_millis(millis: f64) -> String {
    if millis < 0.0 {
        "-".to_string()
    } else if millis >= 1000.0 {
        format!("{:.2}s", millis / 1000.0)
    } else {
        format!("{:.3}ms", millis)
    }
}

/// Color a lifecycle state
pub fn color_state(state: LifecycleState) -> String {
    let text = state.to_string();
    match state {
        LifecycleState::Open => text.yellow().to_string(),
        LifecycleState::Finalized => text.blue().to_string(),
        LifecycleState::StatsComputed => text.green().to_string(),
    }
}

/// Color a check status
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "ok" => status.green().to_string(),
        "missing" => status.yellow().to_string(),
        "invalid" | "error" => status.red().to_string(),
        _ => status.to_string(),
    }
}
