//! Full-text search and backlink queries

use rusqlite::{params, Connection};

use super::error::StoreResult;
use super::pages::page_from_row;
use crate::models::{Page, SearchHit};

/// Maximum number of search results
pub const SEARCH_LIMIT: i64 = 50;
/// Maximum number of backlinks returned
pub const BACKLINK_LIMIT: i64 = 100;
/// Tokens of context around each highlighted match
const SNIPPET_TOKENS: i64 = 10;

/// Ranked full-text search over titles, paths and bodies
///
/// A blank query returns nothing without touching the database. FTS5 syntax
/// errors in `query` come back as `StoreError::Database`.
pub fn search(conn: &Connection, query: &str) -> StoreResult<Vec<SearchHit>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT p.path, p.title,
               snippet(pages_fts, 2, '[', ']', '…', {}) AS snippet
        FROM pages_fts
        JOIN pages p ON p.rowid = pages_fts.rowid
        WHERE pages_fts MATCH ?1
        ORDER BY rank
        LIMIT ?2
        "#,
        SNIPPET_TOKENS
    ))?;

    let hits = stmt
        .query_map(params![query, SEARCH_LIMIT], |row| {
            Ok(SearchHit {
                path: row.get(0)?,
                title: row.get(1)?,
                snippet: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(hits)
}

/// Pages that link to `target`, most recently updated first
pub fn backlinks_to(conn: &Connection, target: &str) -> StoreResult<Vec<Page>> {
    if target.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        r#"
        SELECT p.path, p.title, p.body, p.updated_at
        FROM pages p
        WHERE p.path IN (
            SELECT DISTINCT source_path FROM page_links WHERE target_path = ?1
        )
        ORDER BY p.updated_at DESC
        LIMIT ?2
        "#,
    )?;
    let pages = stmt
        .query_map(params![target, BACKLINK_LIMIT], page_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageInput;
    use crate::storage::error::StoreError;
    use crate::storage::pages::upsert;
    use crate::storage::schema::provision;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        provision(&conn).unwrap();
        conn
    }

    fn save(conn: &Connection, path: &str, title: &str, body: &str, at: &str) {
        let page = PageInput::new(path, title, body)
            .with_updated_at(at)
            .into_page()
            .unwrap();
        upsert(conn, &page).unwrap();
    }

    #[test]
    fn test_blank_query_is_empty() {
        // No schema at all: a blank query must not reach the database
        let conn = Connection::open_in_memory().unwrap();
        assert!(search(&conn, "   ").unwrap().is_empty());
        assert!(backlinks_to(&conn, "").unwrap().is_empty());
    }

    #[test]
    fn test_search_highlights_body() {
        let conn = conn();
        save(
            &conn,
            "/pages/Rust",
            "Rust",
            "Ownership makes memory safety possible without a collector",
            "2024-01-01T00:00:00.000Z",
        );
        save(
            &conn,
            "/pages/Go",
            "Go",
            "Goroutines are cheap",
            "2024-01-01T00:00:00.000Z",
        );

        let hits = search(&conn, "memory").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "/pages/Rust");
        assert_eq!(hits[0].title, "Rust");
        assert!(hits[0].snippet.contains("[memory]"));
    }

    #[test]
    fn test_search_matches_title() {
        let conn = conn();
        save(&conn, "/pages/x", "Gardening", "", "2024-01-01T00:00:00.000Z");
        let hits = search(&conn, "gardening").unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_search_caps_results() {
        let conn = conn();
        for i in 0..60 {
            save(
                &conn,
                &format!("/pages/p{}", i),
                "T",
                "common word",
                "2024-01-01T00:00:00.000Z",
            );
        }
        assert_eq!(search(&conn, "common").unwrap().len(), SEARCH_LIMIT as usize);
    }

    #[test]
    fn test_malformed_query_is_an_error() {
        let conn = conn();
        save(&conn, "/pages/a", "A", "text", "2024-01-01T00:00:00.000Z");
        let result = search(&conn, "\"unbalanced");
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[test]
    fn test_backlinks_include_source_exclude_target() {
        let conn = conn();
        save(&conn, "/pages/A", "A", "links to [[B]]", "2024-01-01T00:00:00.000Z");
        save(&conn, "/pages/B", "B", "no links", "2024-01-01T00:00:00.000Z");

        let backlinks = backlinks_to(&conn, "/pages/B").unwrap();
        assert_eq!(backlinks.len(), 1);
        assert_eq!(backlinks[0].path, "/pages/A");
        assert!(backlinks_to(&conn, "/pages/A").unwrap().is_empty());
    }

    #[test]
    fn test_backlinks_distinct_and_newest_first() {
        let conn = conn();
        // Two labels for the same target still yield one backlink
        save(&conn, "/pages/Old", "Old", "[[T]] [[/pages/T]]", "2023-01-01T00:00:00.000Z");
        save(&conn, "/pages/New", "New", "[[T]]", "2024-06-01T00:00:00.000Z");

        let paths: Vec<_> = backlinks_to(&conn, "/pages/T")
            .unwrap()
            .into_iter()
            .map(|p| p.path)
            .collect();
        assert_eq!(paths, vec!["/pages/New", "/pages/Old"]);
    }
}
