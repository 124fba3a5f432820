//! Whole-corpus replacement
//!
//! The only multi-statement write that runs in an explicit transaction, and
//! the only operation with a retry: a corrupted search index is rebuilt and
//! the replacement is attempted once more.

use rusqlite::Connection;
use tracing::{debug, warn};

use super::error::StoreResult;
use super::{pages, schema};
use crate::models::PageInput;

/// Where the pipeline is in its single permitted retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    AfterRebuild,
}

/// Replace every page (and every link) with `inputs`, atomically
///
/// Any invalid record aborts the whole batch and leaves the previous
/// contents untouched.
pub fn bulk_replace(conn: &mut Connection, inputs: &[PageInput]) -> StoreResult<()> {
    let mut attempt = Attempt::First;
    loop {
        match (replace_once(conn, inputs), attempt) {
            (Ok(()), _) => return Ok(()),
            (Err(e), Attempt::First) if e.is_index_corruption() => {
                warn!("Bulk replace hit a corrupted search index, rebuilding: {}", e);
                schema::rebuild_search_index(conn)?;
                attempt = Attempt::AfterRebuild;
            }
            (Err(e), _) => return Err(e),
        }
    }
}

fn replace_once(conn: &mut Connection, inputs: &[PageInput]) -> StoreResult<()> {
    let tx = conn.transaction()?;

    pages::clear_all(&tx)?;
    for input in inputs {
        let page = input.clone().into_page()?;
        pages::upsert(&tx, &page)?;
    }

    // Dropping `tx` on any early return above rolls back
    tx.commit()?;
    debug!("Replaced corpus with {} page(s)", inputs.len());
    Ok(())
}
