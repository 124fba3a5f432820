//! Storage layer
//!
//! Everything that talks SQL lives here, as free functions over a
//! `rusqlite::Connection`. `Store` in the crate root owns the connection and
//! exposes these as methods.
//!
//! ## Tables
//!
//! - `pages` - Page records, keyed by path
//! - `pages_fts` - Full-text index over pages (auto-synced via triggers)
//! - `page_links` - Wiki links extracted from page bodies

pub mod bulk;
pub mod error;
pub mod pages;
pub mod sandbox;
pub mod schema;
pub mod search;

pub use error::{StoreError, StoreResult};
