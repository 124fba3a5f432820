//! SQLite schema provisioning
//!
//! `pages` is the source of truth. `pages_fts` is an FTS5 external-content
//! index kept in sync by triggers, and `page_links` is derived from page
//! bodies. Only `pages` and `page_links` are required; the search index and
//! link indexes are best-effort and the store stays usable without them.

use rusqlite::{Connection, OptionalExtension};
use tracing::{info, warn};

use super::error::{StoreError, StoreResult};
use super::pages;

const CREATE_PAGES: &str = r#"
    CREATE TABLE IF NOT EXISTS pages (
        path TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
"#;

const CREATE_SEARCH_INDEX: &str = r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS pages_fts USING fts5(
        path,
        title,
        body,
        content='pages',
        content_rowid='rowid'
    );

    CREATE TRIGGER IF NOT EXISTS pages_ai AFTER INSERT ON pages BEGIN
        INSERT INTO pages_fts(rowid, path, title, body)
        VALUES (NEW.rowid, NEW.path, NEW.title, NEW.body);
    END;

    CREATE TRIGGER IF NOT EXISTS pages_ad AFTER DELETE ON pages BEGIN
        INSERT INTO pages_fts(pages_fts, rowid, path, title, body)
        VALUES ('delete', OLD.rowid, OLD.path, OLD.title, OLD.body);
    END;

    CREATE TRIGGER IF NOT EXISTS pages_au AFTER UPDATE ON pages BEGIN
        INSERT INTO pages_fts(pages_fts, rowid, path, title, body)
        VALUES ('delete', OLD.rowid, OLD.path, OLD.title, OLD.body);
        INSERT INTO pages_fts(rowid, path, title, body)
        VALUES (NEW.rowid, NEW.path, NEW.title, NEW.body);
    END;
"#;

const DROP_SEARCH_INDEX: &str = r#"
    DROP TRIGGER IF EXISTS pages_ai;
    DROP TRIGGER IF EXISTS pages_ad;
    DROP TRIGGER IF EXISTS pages_au;
    DROP TABLE IF EXISTS pages_fts;
"#;

/// Empty the FTS5 shadow tables and write a blank structure record, so the
/// virtual table can be constructed (and dropped) again
const RESET_SEARCH_STORAGE: &str = r#"
    DELETE FROM pages_fts_data;
    DELETE FROM pages_fts_idx;
    DELETE FROM pages_fts_docsize;
    INSERT INTO pages_fts_data(id, block) VALUES (10, x'');
"#;

const SEARCH_TRIGGERS: [&str; 3] = ["pages_ai", "pages_ad", "pages_au"];

const CREATE_LINKS: &str = r#"
    CREATE TABLE IF NOT EXISTS page_links (
        source_path TEXT NOT NULL,
        target_path TEXT NOT NULL,
        display TEXT NOT NULL,
        PRIMARY KEY (source_path, target_path, display)
    );
"#;

const CREATE_LINK_INDEXES: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_page_links_target ON page_links(target_path);
    CREATE INDEX IF NOT EXISTS idx_page_links_source ON page_links(source_path);
"#;

/// Bring a freshly opened connection up to the current layout
///
/// Safe to run against an existing database; every step is idempotent.
pub fn provision(conn: &Connection) -> StoreResult<()> {
    set_durability(conn)?;

    conn.execute_batch(CREATE_PAGES)?;

    // Rows written while the index or any trigger was missing are not indexed
    let search_complete = search_available(conn)? && search_triggers_present(conn)?;
    match conn.execute_batch(CREATE_SEARCH_INDEX) {
        Ok(()) if !search_complete => {
            if let Err(e) = backfill_search_index(conn) {
                warn!("Failed to backfill search index: {}", e);
            }
        }
        Ok(()) => {}
        Err(e) => warn!("Full-text search unavailable: {}", e),
    }

    conn.execute_batch(CREATE_LINKS)?;
    if let Err(e) = conn.execute_batch(CREATE_LINK_INDEXES) {
        warn!("Failed to create link indexes: {}", e);
    }

    if pages::link_count(conn)? == 0 && pages::page_count(conn)? > 0 {
        let rebuilt = rebuild_link_graph(conn)?;
        info!("Rebuilt link graph from {} page(s)", rebuilt);
    }

    Ok(())
}

/// WAL keeps readers unblocked and survives crashes mid-write
fn set_durability(conn: &Connection) -> StoreResult<()> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    info!("Journal mode: {}", mode);
    Ok(())
}

/// Check whether the full-text index exists
pub fn search_available(conn: &Connection) -> StoreResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'pages_fts'",
            [],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn search_triggers_present(conn: &Connection) -> StoreResult<bool> {
    let found: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger' AND name IN (?1, ?2, ?3)",
        SEARCH_TRIGGERS,
        |row| row.get(0),
    )?;
    Ok(found == SEARCH_TRIGGERS.len() as i64)
}

fn backfill_search_index(conn: &Connection) -> StoreResult<()> {
    let count = pages::page_count(conn)?;
    if count > 0 {
        conn.execute_batch("INSERT INTO pages_fts(pages_fts) VALUES ('rebuild');")?;
        info!("Indexed {} existing page(s) for search", count);
    }
    Ok(())
}

/// Drop and recreate the full-text index and its triggers, then reindex
///
/// A corrupted FTS5 table cannot be constructed, and so cannot be dropped,
/// until its shadow tables are reset.
pub fn rebuild_search_index(conn: &Connection) -> StoreResult<()> {
    warn!("Rebuilding search index");
    if let Err(e) = conn.execute_batch(DROP_SEARCH_INDEX) {
        let e = StoreError::from(e);
        if !e.is_index_corruption() {
            return Err(e);
        }
        warn!("Clearing corrupted search index storage: {}", e);
        conn.execute_batch(RESET_SEARCH_STORAGE)?;
        conn.execute_batch(DROP_SEARCH_INDEX)?;
    }
    conn.execute_batch(CREATE_SEARCH_INDEX)?;
    conn.execute_batch("INSERT INTO pages_fts(pages_fts) VALUES ('rebuild');")?;
    Ok(())
}

/// Recompute every page's outgoing links, returning how many pages were scanned
fn rebuild_link_graph(conn: &Connection) -> StoreResult<usize> {
    let all = pages::load_all(conn)?;
    for page in &all {
        pages::replace_links_for_source(conn, &page.path, &page.body)?;
    }
    Ok(all.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(conn: &Connection, kind: &str) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
            .unwrap()
            .query_map([kind], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_provision_creates_layout() {
        let conn = Connection::open_in_memory().unwrap();
        provision(&conn).unwrap();

        let tables = names(&conn, "table");
        assert!(tables.contains(&"pages".to_string()));
        assert!(tables.contains(&"pages_fts".to_string()));
        assert!(tables.contains(&"page_links".to_string()));

        let triggers = names(&conn, "trigger");
        assert_eq!(triggers, vec!["pages_ad", "pages_ai", "pages_au"]);

        let indexes = names(&conn, "index");
        assert!(indexes.contains(&"idx_page_links_target".to_string()));
        assert!(indexes.contains(&"idx_page_links_source".to_string()));
    }

    #[test]
    fn test_provision_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        provision(&conn).unwrap();
        provision(&conn).unwrap();
        assert!(search_available(&conn).unwrap());
    }

    #[test]
    fn test_backfills_search_for_pre_index_store() {
        let conn = Connection::open_in_memory().unwrap();
        // A store from before search existed: pages only
        conn.execute_batch(CREATE_PAGES).unwrap();
        conn.execute(
            "INSERT INTO pages (path, title, body, updated_at) VALUES (?1, ?2, ?3, ?4)",
            ["/pages/Old", "Old", "ancient manuscript", "2020-01-01T00:00:00.000Z"],
        )
        .unwrap();

        provision(&conn).unwrap();

        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pages_fts WHERE pages_fts MATCH 'manuscript'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_rebuilds_links_for_pre_link_store() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_PAGES).unwrap();
        conn.execute(
            "INSERT INTO pages (path, title, body, updated_at) VALUES (?1, ?2, ?3, ?4)",
            ["/pages/A", "A", "see [[B]] and [[C]]", "2020-01-01T00:00:00.000Z"],
        )
        .unwrap();

        provision(&conn).unwrap();

        assert_eq!(pages::link_count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_rebuild_search_index_reindexes() {
        let conn = Connection::open_in_memory().unwrap();
        provision(&conn).unwrap();
        conn.execute(
            "INSERT INTO pages (path, title, body, updated_at) VALUES (?1, ?2, ?3, ?4)",
            ["/pages/A", "A", "rebuilt words", "2020-01-01T00:00:00.000Z"],
        )
        .unwrap();

        rebuild_search_index(&conn).unwrap();

        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pages_fts WHERE pages_fts MATCH 'rebuilt'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hits, 1);
        assert_eq!(names(&conn, "trigger").len(), 3);
    }

    fn fts_hits(conn: &Connection, term: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM pages_fts WHERE pages_fts MATCH ?1",
            [term],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_backfills_rows_written_while_trigger_was_missing() {
        let conn = Connection::open_in_memory().unwrap();
        provision(&conn).unwrap();
        conn.execute_batch("DROP TRIGGER pages_ai;").unwrap();
        conn.execute(
            "INSERT INTO pages (path, title, body, updated_at) VALUES (?1, ?2, ?3, ?4)",
            ["/pages/A", "A", "unindexed words", "2020-01-01T00:00:00.000Z"],
        )
        .unwrap();
        assert_eq!(fts_hits(&conn, "unindexed"), 0);

        provision(&conn).unwrap();

        assert_eq!(fts_hits(&conn, "unindexed"), 1);
        assert_eq!(names(&conn, "trigger").len(), 3);
    }

    #[test]
    fn test_rebuild_search_index_clears_corruption() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("corrupt.db");
        {
            let conn = Connection::open(&path).unwrap();
            provision(&conn).unwrap();
            conn.execute(
                "INSERT INTO pages (path, title, body, updated_at) VALUES (?1, ?2, ?3, ?4)",
                ["/pages/A", "A", "surviving words", "2020-01-01T00:00:00.000Z"],
            )
            .unwrap();
            conn.execute(
                "UPDATE pages_fts_data SET block = x'00000000ff7f00' WHERE id = 10",
                [],
            )
            .unwrap();
        }

        // A fresh connection has to construct the table, which fails
        let conn = Connection::open(&path).unwrap();
        let dropped = conn.execute_batch("DROP TABLE pages_fts;");
        assert!(StoreError::from(dropped.unwrap_err()).is_index_corruption());

        rebuild_search_index(&conn).unwrap();

        assert_eq!(fts_hits(&conn, "surviving"), 1);
        assert_eq!(names(&conn, "trigger").len(), 3);
    }
}
