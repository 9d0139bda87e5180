//! Output formatting

use crate::error::CliResult;
use console::{style, Term};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

const LABEL_WIDTH: usize = 12;

/// Writes command results to stdout
#[derive(Debug)]
pub struct Printer {
    term: Term,
    /// Output format
    pub format: OutputFormat,
    /// Whether to use colors
    pub use_color: bool,
}

impl Printer {
    /// Printer writing to stdout
    #[must_use]
    pub fn new(format: OutputFormat, use_color: bool) -> Self {
        Self {
            term: Term::stdout(),
            format,
            use_color,
        }
    }

    /// Whether JSON output was asked for
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Print a value as pretty JSON
    pub fn json<T: Serialize>(&self, value: &T) -> CliResult<()> {
        self.term.write_line(&serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    /// Print a section header
    pub fn header(&self, title: &str) -> CliResult<()> {
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        self.term.write_line(&styled)?;
        Ok(())
    }

    /// Print an aligned `label value` line
    pub fn field(&self, label: &str, value: impl std::fmt::Display) -> CliResult<()> {
        let label = format!("{label:<LABEL_WIDTH$}");
        let label = if self.use_color {
            style(label).cyan().bold().to_string()
        } else {
            label
        };
        self.term.write_line(&format!("{label}{value}"))?;
        Ok(())
    }

    /// Print a record as indented `key = value` lines
    pub fn record(&self, record: &Map<String, Value>) -> CliResult<()> {
        if record.is_empty() {
            self.line("  (empty)")?;
        }
        for (key, value) in record {
            let key = if self.use_color {
                style(key).green().to_string()
            } else {
                key.clone()
            };
            self.term.write_line(&format!("  {key} = {value}"))?;
        }
        Ok(())
    }

    /// Print a plain line
    pub fn line(&self, text: &str) -> CliResult<()> {
        self.term.write_line(text)?;
        Ok(())
    }
}
