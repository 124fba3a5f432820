//! Page rows and their derived links
//!
//! Every write of a page body is paired with `replace_links_for_source`, so
//! `page_links` always mirrors what the stored bodies say. The functions take
//! a plain `&Connection`; a `Transaction` derefs to one, which lets bulk
//! replace reuse them unchanged.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::StoreResult;
use crate::links::extract_links;
use crate::models::{Page, PageLink};

const PAGE_COLUMNS: &str = "path, title, body, updated_at";

pub(crate) fn page_from_row(row: &Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        path: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

/// Every page, ordered by path
pub fn load_all(conn: &Connection) -> StoreResult<Vec<Page>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM pages ORDER BY path ASC",
        PAGE_COLUMNS
    ))?;
    let pages = stmt
        .query_map([], page_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(pages)
}

/// A single page by exact path
pub fn load_one(conn: &Connection, path: &str) -> StoreResult<Option<Page>> {
    let page = conn
        .query_row(
            &format!("SELECT {} FROM pages WHERE path = ?1", PAGE_COLUMNS),
            params![path],
            page_from_row,
        )
        .optional()?;
    Ok(page)
}

/// Insert or fully overwrite a page, then refresh its links
///
/// Uses `ON CONFLICT DO UPDATE` rather than `INSERT OR REPLACE`: a replace
/// deletes the old row without firing the delete trigger, which would leave
/// a stale entry in the search index.
pub fn upsert(conn: &Connection, page: &Page) -> StoreResult<()> {
    conn.execute(
        r#"
        INSERT INTO pages (path, title, body, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(path) DO UPDATE SET
            title = excluded.title,
            body = excluded.body,
            updated_at = excluded.updated_at
        "#,
        params![page.path, page.title, page.body, page.updated_at],
    )?;
    replace_links_for_source(conn, &page.path, &page.body)
}

/// Remove a page and every link it is the source of
pub fn delete(conn: &Connection, path: &str) -> StoreResult<()> {
    conn.execute("DELETE FROM pages WHERE path = ?1", params![path])?;
    conn.execute(
        "DELETE FROM page_links WHERE source_path = ?1",
        params![path],
    )?;
    Ok(())
}

/// Replace the outgoing links of `source` with those found in `body`
///
/// Collisions on the (source, target, display) key are ignored, which keeps
/// repeated saves of the same body idempotent.
pub fn replace_links_for_source(conn: &Connection, source: &str, body: &str) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM page_links WHERE source_path = ?1",
        params![source],
    )?;

    let links = extract_links(body);
    if links.is_empty() {
        return Ok(());
    }

    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO page_links (source_path, target_path, display) VALUES (?1, ?2, ?3)",
    )?;
    for link in &links {
        stmt.execute(params![source, link.target_path, link.display])?;
    }
    Ok(())
}

/// Outgoing links of one page, sorted
pub fn links_from(conn: &Connection, source: &str) -> StoreResult<Vec<PageLink>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT source_path, target_path, display FROM page_links
        WHERE source_path = ?1
        ORDER BY target_path, display
        "#,
    )?;
    let links = stmt
        .query_map(params![source], |row| {
            Ok(PageLink {
                source_path: row.get(0)?,
                target_path: row.get(1)?,
                display: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

pub fn page_count(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?)
}

pub fn link_count(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM page_links", [], |row| row.get(0))?)
}

/// Clear all pages and links (schema is preserved)
pub(crate) fn clear_all(conn: &Connection) -> StoreResult<()> {
    conn.execute("DELETE FROM page_links", [])?;
    conn.execute("DELETE FROM pages", [])?;
    Ok(())
}
