//! Folio Core Library
//!
//! A local page store: SQLite holds the pages, an FTS5 index serves ranked
//! search, and a link table derived from `[[wiki links]]` answers backlink
//! queries.
//!
//! # Architecture
//!
//! - **SQLite**: source of truth for pages; every write keeps the search
//!   index (via triggers) and the link graph in step
//! - **Gateway**: all access from async code goes through one storage worker
//!   that answers JSON request envelopes in order
//!
//! # Quick Start
//!
//! ```text
//! let client = Client::spawn(&Config::load()?);
//!
//! client.save_note(PageInput::new("/pages/Rust", "Rust", "See [[Cargo]]")).await?;
//! let hits = client.search_notes("cargo").await?;
//! let backlinks = client.list_backlinks("/pages/Cargo").await?;
//! ```
//!
//! # Modules
//!
//! - `store`: synchronous storage interface
//! - `rpc`: request envelopes, gateway worker, and client
//! - `models`: pages, search hits, query results, validation
//! - `links`: wiki-link extraction
//! - `storage`: schema, queries, and error taxonomy
//! - `config`: application configuration

pub mod config;
pub mod links;
pub mod models;
pub mod rpc;
pub mod storage;
pub mod store;

pub use config::Config;
pub use models::{Page, PageInput, PageLink, QueryResult, SearchHit, ValidationError};
pub use rpc::{Client, Gateway, RpcError, StoreHandle};
pub use storage::{StoreError, StoreResult};
pub use store::Store;
