//! Status command handler

use anyhow::{Context, Result};
use serde_json::Value;

use folio_core::{Client, Config};

use crate::output::{Output, OutputFormat};

/// Counts and index state, read through the query sandbox
const STATUS_QUERY: &str = "SELECT \
    (SELECT COUNT(*) FROM pages) AS pages, \
    (SELECT COUNT(*) FROM page_links) AS links, \
    EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'pages_fts') AS search";

/// Show status information
pub async fn show(client: &Client, config: &Config, output: &Output) -> Result<()> {
    let result = client
        .run_query(STATUS_QUERY)
        .await
        .context("Failed to read database status")?;

    let row = result.rows.first().cloned().unwrap_or_default();
    let count = |i: usize| row.get(i).and_then(Value::as_i64).unwrap_or(0);
    let (pages, links, search) = (count(0), count(1), count(2) != 0);

    let database_path = config.database_path();
    let database_size = std::fs::metadata(&database_path)
        .map(|m| m.len())
        .unwrap_or(0);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "database_path": database_path,
                    "database_size": database_size,
                    "search_available": search,
                    "counts": {
                        "pages": pages,
                        "links": links
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", pages);
        }
        OutputFormat::Human => {
            println!("Folio Status");
            println!("============");
            println!();
            println!("Storage:");
            println!("  Location: {}", database_path.display());
            println!("  Size:     {}", human_size(database_size));
            println!(
                "  Search:   {}",
                if search { "available" } else { "unavailable" }
            );
            println!();
            println!("Contents:");
            println!("  Pages: {}", pages);
            println!("  Links: {}", links);
        }
    }

    Ok(())
}

fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
