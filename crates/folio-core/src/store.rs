//! Unified storage interface
//!
//! The `Store` owns the single SQLite connection for a worker and exposes
//! every page operation as a method. Opening a store provisions the schema.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open(&Config::load()?)?;
//!
//! store.save(PageInput::new("/pages/Rust", "Rust", "See [[Cargo]]"))?;
//! let backlinks = store.backlinks_to("/pages/Cargo")?;
//! ```

use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::config::Config;
use crate::models::{validate_path, Page, PageInput, QueryResult, SearchHit};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::{bulk, pages, sandbox, schema, search};

/// Single-connection page store
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open the store at the configured data directory
    pub fn open(config: &Config) -> StoreResult<Self> {
        Self::open_path(&config.database_path())
    }

    /// Open or create a database file, creating its directory if needed
    pub fn open_path(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        schema::provision(&conn)?;

        let store = Self { conn };
        info!(
            "Opened page store at {:?} ({} pages, {} links, search {})",
            path,
            store.page_count()?,
            store.link_count()?,
            if store.search_available()? { "available" } else { "unavailable" }
        );
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::provision(&conn)?;
        Ok(Self { conn })
    }

    // ==================== Pages ====================

    /// Every page, ordered by path
    pub fn load_all(&self) -> StoreResult<Vec<Page>> {
        pages::load_all(&self.conn)
    }

    /// A page by exact path; `None` when absent
    pub fn load_one(&self, path: &str) -> StoreResult<Option<Page>> {
        pages::load_one(&self.conn, path)
    }

    /// Validate and upsert a page, refreshing its outgoing links
    pub fn save(&mut self, input: PageInput) -> StoreResult<Page> {
        let page = input.into_page()?;
        pages::upsert(&self.conn, &page)?;
        Ok(page)
    }

    /// Delete a page and its outgoing links; missing paths are a no-op
    pub fn delete(&mut self, path: &str) -> StoreResult<()> {
        validate_path(path)?;
        pages::delete(&self.conn, path)
    }

    /// Atomically replace the whole corpus
    pub fn bulk_replace(&mut self, inputs: &[PageInput]) -> StoreResult<()> {
        bulk::bulk_replace(&mut self.conn, inputs)
    }

    // ==================== Queries ====================

    /// Ranked full-text search with highlighted snippets
    pub fn search(&self, query: &str) -> StoreResult<Vec<SearchHit>> {
        search::search(&self.conn, query)
    }

    /// Pages linking to `target`
    pub fn backlinks_to(&self, target: &str) -> StoreResult<Vec<Page>> {
        search::backlinks_to(&self.conn, target)
    }

    /// Run a single read-only statement
    pub fn run_query(&self, text: &str) -> StoreResult<QueryResult> {
        sandbox::run_query(&self.conn, text)
    }

    // ==================== Stats ====================

    pub fn page_count(&self) -> StoreResult<i64> {
        pages::page_count(&self.conn)
    }

    pub fn link_count(&self) -> StoreResult<i64> {
        pages::link_count(&self.conn)
    }

    /// Whether full-text search is provisioned
    pub fn search_available(&self) -> StoreResult<bool> {
        schema::search_available(&self.conn)
    }
}
