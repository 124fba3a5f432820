//! Lazily opened, shared store
//!
//! The first caller of `StoreHandle::get` opens the database on a blocking
//! thread; callers that arrive while that is in progress wait on the same
//! initialization. A failed open is remembered, and every later call gets
//! `StoreError::Unavailable` without retrying.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::error;

use crate::config::Config;
use crate::storage::error::{StoreError, StoreResult};
use crate::store::Store;

/// A store shared between the handle and the worker's blocking tasks
pub type SharedStore = Arc<Mutex<Store>>;

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

impl Location {
    fn open(&self) -> StoreResult<Store> {
        match self {
            Location::File(path) => Store::open_path(path),
            Location::Memory => Store::open_in_memory(),
        }
    }
}

pub struct StoreHandle {
    location: Location,
    cell: OnceCell<Option<SharedStore>>,
}

impl StoreHandle {
    /// Handle for the database under `config.data_dir`
    pub fn new(config: &Config) -> Self {
        Self::at(Location::File(config.database_path()))
    }

    /// Handle for a private in-memory database
    pub fn in_memory() -> Self {
        Self::at(Location::Memory)
    }

    fn at(location: Location) -> Self {
        Self {
            location,
            cell: OnceCell::new(),
        }
    }

    /// The open store, initializing it on first use
    pub async fn get(&self) -> StoreResult<SharedStore> {
        let slot = self
            .cell
            .get_or_init(|| async {
                let location = self.location.clone();
                match tokio::task::spawn_blocking(move || location.open()).await {
                    Ok(Ok(store)) => Some(Arc::new(Mutex::new(store))),
                    Ok(Err(e)) => {
                        error!("Failed to open page store: {}", e);
                        None
                    }
                    Err(e) => {
                        error!("Page store initialization panicked: {}", e);
                        None
                    }
                }
            })
            .await;
        slot.clone().ok_or(StoreError::Unavailable)
    }

    /// Whether initialization has been attempted
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}
