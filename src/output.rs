use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

/// A non-fatal problem with a single card or entry. The run continues and the
/// card passes through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaWarning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    pub message: String,
}

impl SchemaWarning {
    pub fn new(card_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            card_id: card_id.map(str::to_string),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.card_id {
            Some(id) => write!(f, "[{id}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Print a one-line JSON document.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

pub fn print_heading(title: &str, detail: &str) {
    println!("{} {}", title.bold(), format!("({detail})").dimmed());
}

pub fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("  {} {}", format!("{label}:").dimmed(), value);
}

pub fn print_warnings(warnings: &[SchemaWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!("\n{}", "Warnings".yellow().bold());
    for warning in warnings {
        println!("  - {}", warning.to_string().yellow());
    }
}
