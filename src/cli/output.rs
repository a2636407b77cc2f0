//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the molecule-insight CLI.

use crate::cache::CacheItemInfo;
use crate::types::{AgentUpdate, AnalysisResult, UpdateStatus, WorkerResult};
use crate::workers::{report_text, WorkerInfo};
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the startup banner
    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}\n",
                "MoleculeInsight".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!("\n   MoleculeInsight v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a subheader
    pub fn subheader(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.cyan().bold());
        } else {
            println!("\n  --- {} ---", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a block of text indented under the current section
    pub fn block(&self, text: &str) {
        for line in text.lines() {
            println!("    {}", line);
        }
    }

    /// Print one progress timeline entry
    pub fn update(&self, update: &AgentUpdate) {
        let status = match update.status {
            UpdateStatus::Running => "running",
            UpdateStatus::Completed => "done",
            UpdateStatus::Error => "error",
        };
        if self.colored {
            let status = match update.status {
                UpdateStatus::Running => status.blue().to_string(),
                UpdateStatus::Completed => status.green().to_string(),
                UpdateStatus::Error => status.red().to_string(),
            };
            println!(
                "    {:<26} {:<8} {}",
                update.agent.bright_white(),
                status,
                update.message.dimmed()
            );
        } else {
            println!("    {:<26} {:<8} {}", update.agent, status, update.message);
        }
    }

    /// Print one worker's slot: its report, or why it failed
    pub fn worker_result(&self, result: &WorkerResult) {
        let title = if result.served_from_cache {
            format!("{} (cached)", result.worker_name)
        } else {
            result.worker_name.clone()
        };
        self.subheader(&title);

        match (&result.payload, &result.error) {
            (Some(payload), _) => self.block(&report_text(payload)),
            (None, Some(error)) => self.error(error),
            (None, None) => self.warning("no output"),
        }
    }

    /// Print the synthesized opportunities, one list item per entry
    pub fn opportunities(&self, result: &WorkerResult) {
        self.header("Innovation Opportunities");

        let Some(payload) = &result.payload else {
            self.error(result.error.as_deref().unwrap_or("synthesis failed"));
            return;
        };

        match payload.as_array() {
            Some(items) if items.is_empty() => self.warning("No opportunities identified"),
            Some(items) => {
                for item in items {
                    let title = item["title"].as_str().unwrap_or("Untitled");
                    let description = item["description"].as_str().unwrap_or_default();
                    if self.colored {
                        println!("    {} {}", "•".blue(), title.bright_white().bold());
                    } else {
                        println!("    - {}", title);
                    }
                    println!("      {}", description);
                }
            }
            None => self.block(&report_text(payload)),
        }
    }

    /// Print a complete analysis
    pub fn analysis(&self, result: &AnalysisResult, duration_ms: u64) {
        self.header(&format!("{} ({})", result.subject, result.geography));
        self.kv("query", &result.query);
        self.kv(
            "workers",
            &format!("{}/{} succeeded", result.succeeded(), result.workers.len()),
        );
        self.kv("duration", &format!("{} ms", duration_ms));

        self.header("Timeline");
        for update in &result.updates {
            self.update(update);
        }

        self.header("Reports");
        for worker in result.workers.values() {
            self.worker_result(worker);
        }

        self.opportunities(&result.synthesis);
        self.newline();
    }

    /// Print cache entries as a table
    pub fn cache_items(&self, items: &[CacheItemInfo]) {
        if items.is_empty() {
            self.info("Cache is empty");
            return;
        }
        self.table_header(&["Worker", "Molecule", "Age (h)", "Expired"]);
        for item in items {
            let age = format!("{:.1}", item.age_hours);
            let expired = if item.expired { "yes" } else { "no" };
            self.table_row(&[&item.namespace, &item.subject, &age, expired]);
        }
    }

    /// Print the worker registry
    pub fn workers(&self, workers: &[WorkerInfo]) {
        for worker in workers {
            self.subheader(&format!("{} ({})", worker.name, worker.kind));
            self.kv("name", &worker.display_name);
            self.kv("description", &worker.description);
            for (key, value) in &worker.args {
                self.kv(key, value);
            }
        }
    }

    /// Print a table header row
    pub fn table_header(&self, columns: &[&str]) {
        let header: String = columns
            .iter()
            .map(|c| format!("{:<18}", c))
            .collect::<Vec<_>>()
            .join(" ");
        if self.colored {
            println!("    {}", header.bright_white().bold());
            println!("    {}", "─".repeat(columns.len() * 19).dimmed());
        } else {
            println!("    {}", header);
            println!("    {}", "-".repeat(columns.len() * 19));
        }
    }

    /// Print a table row
    pub fn table_row(&self, values: &[&str]) {
        let row: String = values
            .iter()
            .map(|v| format!("{:<18}", v))
            .collect::<Vec<_>>()
            .join(" ");
        println!("    {}", row);
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}
