//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
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

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format GiB as a human-readable string
pub fn format_gib(gib: f64) -> String {
    if gib >= 1.0 {
        format!("{:.2}Gi", gib)
    } else if gib * 1024.0 >= 1.0 {
        format!("{:.0}Mi", gib * 1024.0)
    } else if gib > 0.0 {
        format!("{:.0}Ki", gib * 1024.0 * 1024.0)
    } else {
        "0".to_string()
    }
}

/// Format cores as a human-readable string
pub fn format_cores(cores: f64) -> String {
    if cores >= 1.0 {
        format!("{:.2}", cores)
    } else {
        format!("{:.0}m", cores * 1000.0)
    }
}

/// Format an optional measurement, showing a dash when it was not taken
pub fn format_optional(value: Option<f64>, format: fn(f64) -> String) -> String {
    value.map(format).unwrap_or_else(|| "-".to_string())
}

/// Share of `part` in `whole` as a percentage
pub fn format_share(part: f64, whole: f64) -> String {
    if whole > 0.0 {
        format!("{:.1}%", part / whole * 100.0)
    } else {
        "-".to_string()
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "complete" | "yes" => status.green().to_string(),
        "degraded" | "interrupted" => status.yellow().to_string(),
        "unhealthy" | "incomplete" => status.red().to_string(),
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_gib() {
        assert_eq!(format_gib(16.0), "16.00Gi");
        assert_eq!(format_gib(0.5), "512Mi");
        assert_eq!(format_gib(0.0), "0");
    }

    #[test]
    fn test_format_cores() {
        assert_eq!(format_cores(2.0), "2.00");
        assert_eq!(format_cores(0.25), "250m");
        assert_eq!(format_cores(0.0), "0m");
    }

    #[test]
    fn test_format_optional_and_share() {
        assert_eq!(format_optional(None, format_cores), "-");
        assert_eq!(format_optional(Some(1.5), format_cores), "1.50");
        assert_eq!(format_share(1.0, 4.0), "25.0%");
        assert_eq!(format_share(1.0, 0.0), "-");
    }
}
