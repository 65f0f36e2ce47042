//! Terminal output for the demo commands.
//!
//! Report data (headers, fields, JSON forms) goes to stdout so it can be
//! piped into another tool. Status lines go to stderr.

use anyhow::Result;
use colored::Colorize;

/// Status line for an accepted operation.
pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Status line for an authentication or input failure.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Status line for a declined payment or a sensitive value on screen.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

pub fn header(text: &str) {
    println!("\n{}", text.bold().underline());
}

/// One report field.
pub fn key_value(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Report field printed only when the gateway sent it.
pub fn optional_field(key: &str, value: Option<&str>) {
    if let Some(value) = value {
        key_value(key, value);
    }
}

/// Report field for a boolean gateway flag.
pub fn flag(key: &str, set: bool) {
    key_value(key, if set { "yes" } else { "no" });
}

pub fn separator() {
    println!("{}", "─".repeat(60).dimmed());
}

/// Uncoloured pretty JSON, so the output stays machine-readable.
pub fn json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
