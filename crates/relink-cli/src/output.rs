//! Output formatting helpers.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message to stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a bold heading.
pub fn heading(text: &str) {
    println!("{}", text.bold());
}

/// Print a labeled field, indented under a heading.
pub fn field(label: &str, value: &str) {
    println!("  {}: {}", label.dimmed(), value);
}

/// Print a value as JSON on stdout.
pub fn json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
