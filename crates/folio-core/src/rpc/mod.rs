//! Asynchronous request/response gateway to the store
//!
//! Callers talk to the store through JSON envelopes. A `Gateway` runs the
//! store on its own worker and answers requests one at a time; a `Client`
//! correlates responses with callers, applies timeouts, and sends advisory
//! cancel notices for requests it gives up on.

pub mod client;
pub mod gateway;
pub mod handle;
pub mod message;
pub mod tracker;

use std::time::Duration;

use thiserror::Error;

use crate::storage::error::StoreError;

pub use client::Client;
pub use gateway::{Endpoint, Gateway};
pub use handle::StoreHandle;
pub use message::{Operation, Request, RequestId, Response};

#[derive(Error, Debug)]
pub enum RpcError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request {id} timed out after {after:?}")]
    Timeout { id: RequestId, after: Duration },

    /// The worker answered with an error envelope
    #[error("{0}")]
    Remote(String),

    #[error("gateway is not running")]
    Disconnected,

    #[error("storage task failed: {0}")]
    Worker(String),
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;
