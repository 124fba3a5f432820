//! Page command handlers
//!
//! Every command goes through the RPC client, the same path `serve` uses.

use anyhow::{Context, Result};

use folio_core::links::normalize_target;
use folio_core::{Client, Page, PageInput};

use crate::editor::{confirm, edit_text};
use crate::output::Output;

/// List all pages
pub async fn list(client: &Client, output: &Output) -> Result<()> {
    let pages = client.load_notes().await.context("Failed to load pages")?;
    output.print_pages(&pages);
    Ok(())
}

/// Show a single page
pub async fn show(client: &Client, path: &str, output: &Output) -> Result<()> {
    let path = normalize_target(path);
    let page = find(client, &path)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Page not found: {}", path))?;

    output.print_page(&page);
    Ok(())
}

/// Create or update a page
///
/// Without `--body` the current body (if any) is opened in the editor.
pub async fn save(
    client: &Client,
    path: &str,
    title: Option<String>,
    body: Option<String>,
    output: &Output,
) -> Result<()> {
    let path = normalize_target(path);
    let existing = find(client, &path).await?;

    let title = title
        .or_else(|| existing.as_ref().map(|p| p.title.clone()))
        .unwrap_or_else(|| default_title(&path));

    let body = match body {
        Some(b) => b,
        None => {
            let initial = existing.as_ref().map(|p| p.body.as_str()).unwrap_or("");
            edit_text(initial).context("Failed to edit page")?
        }
    };

    client
        .save_note(PageInput::new(path.as_str(), title, body))
        .await
        .context("Failed to save page")?;

    let verb = if existing.is_some() { "Updated" } else { "Created" };
    output.success(&format!("{} page: {}", verb, path));
    Ok(())
}

/// Delete a page, asking first unless `yes` is set
pub async fn delete(client: &Client, path: &str, yes: bool, output: &Output) -> Result<()> {
    let path = normalize_target(path);

    let Some(page) = find(client, &path).await? else {
        output.message(&format!("No page at {}", path));
        return Ok(());
    };

    if !yes && output.should_prompt() {
        println!("Delete page: {} - {}", page.path, page.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    client
        .delete_note(&path)
        .await
        .context("Failed to delete page")?;

    output.success(&format!("Deleted page: {}", path));
    Ok(())
}

/// Full-text search
pub async fn search(client: &Client, query: &str, output: &Output) -> Result<()> {
    let hits = client.search_notes(query).await.context("Search failed")?;
    output.print_hits(&hits);
    Ok(())
}

/// Pages linking to `path`
pub async fn backlinks(client: &Client, path: &str, output: &Output) -> Result<()> {
    let path = normalize_target(path);
    let pages = client
        .list_backlinks(&path)
        .await
        .context("Failed to list backlinks")?;
    output.print_pages(&pages);
    Ok(())
}

/// Run a read-only query
pub async fn query(client: &Client, sql: &str, output: &Output) -> Result<()> {
    let result = client.run_query(sql).await.context("Query failed")?;
    output.print_query(&result);
    Ok(())
}

/// Look up one page by path
///
/// The protocol has no single-page load, so this filters the full listing.
async fn find(client: &Client, path: &str) -> Result<Option<Page>> {
    let pages = client.load_notes().await.context("Failed to load pages")?;
    Ok(pages.into_iter().find(|p| p.path == path))
}

/// Last path segment, e.g. "Rust" for "/pages/Rust"
fn default_title(path: &str) -> String {
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
        .to_string()
}
