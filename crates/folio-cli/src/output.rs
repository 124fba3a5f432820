//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;
use serde_json::Value;

use folio_core::{Page, QueryResult, SearchHit};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single page
    pub fn print_page(&self, page: &Page) {
        match self.format {
            OutputFormat::Human => {
                println!("Path:    {}", page.path);
                println!("Title:   {}", page.title);
                println!("Updated: {}", page.updated_at);
                if !page.body.is_empty() {
                    println!();
                    println!("{}", page.body);
                }
            }
            OutputFormat::Json => print_json(page),
            OutputFormat::Quiet => println!("{}", page.path),
        }
    }

    /// Print a list of pages
    pub fn print_pages(&self, pages: &[Page]) {
        match self.format {
            OutputFormat::Human => {
                if pages.is_empty() {
                    println!("No pages found.");
                    return;
                }
                for page in pages {
                    println!(
                        "{} | {} | {}",
                        truncate(&page.path, 40),
                        truncate(&page.title, 35),
                        page.updated_at
                    );
                }
                println!("\n{} page(s)", pages.len());
            }
            OutputFormat::Json => print_json(pages),
            OutputFormat::Quiet => {
                for page in pages {
                    println!("{}", page.path);
                }
            }
        }
    }

    /// Print search hits with their snippets
    pub fn print_hits(&self, hits: &[SearchHit]) {
        match self.format {
            OutputFormat::Human => {
                if hits.is_empty() {
                    println!("No matches.");
                    return;
                }
                for hit in hits {
                    println!("{} - {}", hit.path, hit.title);
                    println!("    {}", hit.snippet.replace('\n', " "));
                }
                println!("\n{} match(es)", hits.len());
            }
            OutputFormat::Json => print_json(hits),
            OutputFormat::Quiet => {
                for hit in hits {
                    println!("{}", hit.path);
                }
            }
        }
    }

    /// Print a sandbox query result as a table
    pub fn print_query(&self, result: &QueryResult) {
        match self.format {
            OutputFormat::Human => {
                if result.columns.is_empty() {
                    println!("(no rows)");
                    return;
                }
                println!("{}", result.columns.join(" | "));
                println!("{}", "-".repeat(result.columns.join(" | ").chars().count()));
                for row in &result.rows {
                    println!("{}", render_row(row, " | "));
                }
                let suffix = if result.truncated { ", truncated" } else { "" };
                println!("\n({} row(s){})", result.rows.len(), suffix);
            }
            OutputFormat::Json => print_json(result),
            OutputFormat::Quiet => {
                for row in &result.rows {
                    println!("{}", render_row(row, "\t"));
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

/// Render a result row, showing strings without quotes and nulls as NULL
fn render_row(row: &[Value], separator: &str) -> String {
    row.iter()
        .map(|value| match value {
            Value::Null => "NULL".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(separator)
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_render_row() {
        let row = vec![json!("/pages/A"), json!(3), Value::Null, json!(1.5)];
        assert_eq!(render_row(&row, " | "), "/pages/A | 3 | NULL | 1.5");
    }
}
