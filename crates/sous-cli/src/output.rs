//! Output formatting and writing utilities
//!
//! Results are written in the selected format (human, JSON, YAML). Status
//! lines only appear in human mode so machine formats stay parseable.

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::logging::redaction;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use sous_core::{ModelInfo, PersistedRecipe, RecipeDraft};
use std::io::{self, IsTerminal, Write};
use std::time::Duration;
use tracing::{debug, trace};

/// Trait for formatting output with specialized support for recipe types
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format a recipe draft
    fn format_recipe(&self, recipe: &RecipeDraft) -> Result<String>;

    /// Format a persisted recipe with its metadata
    fn format_saved_recipe(&self, recipe: &PersistedRecipe) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
        }
    }

    fn format_recipe(&self, recipe: &RecipeDraft) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_recipe_human(&recipe.title, &recipe.content)),
            _ => self.format(recipe),
        }
    }

    fn format_saved_recipe(&self, recipe: &PersistedRecipe) -> Result<String> {
        match self {
            OutputFormat::Human => {
                let mut output = format_recipe_human(&recipe.title, &recipe.content);
                output.push_str(&format!(
                    "\n(recipe #{}, updated {})",
                    recipe.id,
                    recipe.updated_at.format("%Y-%m-%d %H:%M")
                ));
                Ok(output)
            }
            _ => self.format(recipe),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    show_progress: bool,
    quiet: bool,
    writer: Box<dyn Write + Send>,
}

impl OutputWriter {
    /// Create a new output writer on stdout
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool, progress: bool) -> Self {
        Self {
            format,
            use_color,
            show_progress: progress && !quiet && io::stderr().is_terminal(),
            quiet,
            writer: Box::new(io::stdout()),
        }
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(
        format: OutputFormat,
        use_color: bool,
        quiet: bool,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            format,
            use_color,
            show_progress: false, // No progress bars with custom writers
            quiet,
            writer,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Write raw output
    pub fn write(&mut self, content: &str) -> Result<()> {
        write!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message
    pub fn info(&mut self, message: &str) -> Result<()> {
        debug!("Output info: {}", message);

        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a success message
    pub fn success(&mut self, message: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.green().to_string())
        } else {
            self.writeln(message)
        }
    }

    /// Write a warning message
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if !self.is_human() {
            return Ok(());
        }

        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write a section header
    pub fn section(&mut self, title: &str) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        self.writeln("")?;
        if self.use_color {
            self.writeln(&format!("═══ {} ═══", title).bright_blue().to_string())
        } else {
            self.writeln(&format!("=== {} ===", title))
        }
    }

    /// Write data in the configured format
    pub fn data<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let mut value_json = serde_json::to_value(value)?;
        redaction::redact_json_value(&mut value_json);
        trace!("Outputting data: {}", value_json);

        let formatted = self.format.format(value)?;
        self.emit(&formatted)
    }

    /// Write a recipe draft
    pub fn recipe(&mut self, recipe: &RecipeDraft) -> Result<()> {
        let formatted = self.format.format_recipe(recipe)?;
        self.emit(&formatted)
    }

    /// Write a persisted recipe
    pub fn saved_recipe(&mut self, recipe: &PersistedRecipe) -> Result<()> {
        let formatted = self.format.format_saved_recipe(recipe)?;
        self.emit(&formatted)
    }

    /// Write the model catalog as a table, or as data in machine formats
    pub fn models(&mut self, models: &[ModelInfo], selected: Option<&str>) -> Result<()> {
        if !self.is_human() {
            return self.data(&models);
        }

        let rows = models
            .iter()
            .map(|model| {
                let marker = if Some(model.id.as_str()) == selected { "*" } else { "" };
                vec![
                    format!("{}{}", model.id, marker),
                    model.name.clone(),
                    model.context_window.to_string(),
                    model
                        .max_completion_tokens
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ]
            })
            .collect();
        self.table(&["ID", "NAME", "CONTEXT", "MAX OUTPUT"], rows)
    }

    fn emit(&mut self, formatted: &str) -> Result<()> {
        if formatted.ends_with('\n') {
            self.write(formatted)
        } else {
            self.writeln(formatted)
        }
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Some(style) = default_spinner_style() {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    /// Write a table (for human format)
    pub fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        if self.quiet || !self.is_human() {
            return Ok(());
        }

        let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        let header_row = headers
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" │ ");

        if self.use_color {
            self.writeln(&header_row.bold().to_string())?;
        } else {
            self.writeln(&header_row)?;
        }

        let separator = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");
        self.writeln(&separator)?;

        for row in rows {
            let row_str = row
                .iter()
                .enumerate()
                .map(|(i, cell)| match widths.get(i) {
                    Some(width) => format!("{:width$}", cell, width = width),
                    None => cell.clone(),
                })
                .collect::<Vec<_>>()
                .join(" │ ");
            self.writeln(row_str.trim_end())?;
        }

        Ok(())
    }
}

/// Spinner style shared by long-running commands
pub fn default_spinner_style() -> Option<ProgressStyle> {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} ({elapsed})")
        .ok()
}

/// Format a recipe for human reading
fn format_recipe_human(title: &str, content: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", title));
    output.push_str(content.trim_end());
    output.push('\n');
    output
}
