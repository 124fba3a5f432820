//! Caller side of the gateway
//!
//! Assigns request ids, routes responses back to the waiting caller, and
//! turns a missed deadline into `RpcError::Timeout` plus a cancel notice.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::gateway::{Endpoint, Gateway};
use super::handle::StoreHandle;
use super::message::{CancelArg, Operation, PathArg, QueryArg, Request, RequestId, Response};
use super::{RpcError, RpcResult};
use crate::config::Config;
use crate::models::{Page, PageInput, QueryResult, SearchHit};

type Pending = Arc<Mutex<HashMap<RequestId, oneshot::Sender<Response>>>>;

fn lock(pending: &Pending) -> MutexGuard<'_, HashMap<RequestId, oneshot::Sender<Response>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Client {
    next_id: AtomicU64,
    requests: mpsc::UnboundedSender<Value>,
    pending: Pending,
    timeout: Duration,
}

impl Client {
    /// Start a gateway for the configured database and connect to it
    ///
    /// The database itself is opened on the first request.
    pub fn spawn(config: &Config) -> Self {
        let gateway = Gateway::new(Arc::new(StoreHandle::new(config)));
        Self::connect(gateway.spawn(), config.request_timeout())
    }

    /// Attach to a running gateway
    pub fn connect(endpoint: Endpoint, timeout: Duration) -> Self {
        let Endpoint {
            requests,
            mut responses,
        } = endpoint;
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

        let router = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(response) = responses.recv().await {
                let id = response.id();
                match lock(&router).remove(&id) {
                    Some(waiter) => {
                        let _ = waiter.send(response);
                    }
                    None => debug!("Discarding response for request {} (no caller waiting)", id),
                }
            }
            // Gateway is gone; wake everyone still waiting
            lock(&router).clear();
        });

        Self {
            next_id: AtomicU64::new(1),
            requests,
            pending,
            timeout,
        }
    }

    /// Send an operation and wait for its result
    pub async fn call(&self, operation: Operation) -> RpcResult<Value> {
        self.call_with_timeout(operation, self.timeout).await
    }

    async fn call_with_timeout(&self, operation: Operation, after: Duration) -> RpcResult<Value> {
        let id = self.next_id();
        let message = Request::new(id, operation).encode()?;

        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);

        if self.requests.send(message).is_err() {
            lock(&self.pending).remove(&id);
            return Err(RpcError::Disconnected);
        }

        match tokio::time::timeout(after, rx).await {
            Ok(Ok(Response::Success { result, .. })) => Ok(result),
            Ok(Ok(Response::Failure { error, .. })) => Err(RpcError::Remote(error)),
            Ok(Err(_)) => Err(RpcError::Disconnected),
            Err(_) => {
                lock(&self.pending).remove(&id);
                self.cancel(id);
                Err(RpcError::Timeout { id, after })
            }
        }
    }

    /// Tell the gateway not to answer `target_id`
    fn cancel(&self, target_id: RequestId) {
        let notice = Request::new(
            self.next_id(),
            Operation::CancelRequest(CancelArg { target_id }),
        );
        match notice.encode() {
            Ok(message) => {
                let _ = self.requests.send(message);
            }
            Err(e) => debug!("Failed to encode cancel for request {}: {}", target_id, e),
        }
    }

    fn next_id(&self) -> RequestId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn call_as<T: DeserializeOwned>(&self, operation: Operation) -> RpcResult<T> {
        let result = self.call(operation).await?;
        Ok(serde_json::from_value(result)?)
    }

    // ==================== Operations ====================

    pub async fn load_notes(&self) -> RpcResult<Vec<Page>> {
        self.call_as(Operation::LoadNotes).await
    }

    pub async fn save_note(&self, input: PageInput) -> RpcResult<()> {
        self.call(Operation::SaveNote(input)).await.map(drop)
    }

    pub async fn delete_note(&self, path: &str) -> RpcResult<()> {
        self.call(Operation::DeleteNote(PathArg::from(path)))
            .await
            .map(drop)
    }

    pub async fn bulk_save_notes(&self, inputs: Vec<PageInput>) -> RpcResult<()> {
        self.call(Operation::BulkSaveNotes(inputs)).await.map(drop)
    }

    pub async fn search_notes(&self, query: &str) -> RpcResult<Vec<SearchHit>> {
        self.call_as(Operation::SearchNotes(QueryArg::from(query)))
            .await
    }

    pub async fn list_backlinks(&self, path: &str) -> RpcResult<Vec<Page>> {
        self.call_as(Operation::ListBacklinks(PathArg::from(path)))
            .await
    }

    pub async fn run_query(&self, query: &str) -> RpcResult<QueryResult> {
        self.call_as(Operation::RunQuery(QueryArg::from(query)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn in_memory_client() -> Client {
        let gateway = Gateway::new(Arc::new(StoreHandle::in_memory()));
        Client::connect(gateway.spawn(), Duration::from_secs(5))
    }

    fn page(path: &str, body: &str) -> PageInput {
        PageInput::new(path, path.trim_start_matches("/pages/"), body)
    }

    #[tokio::test]
    async fn test_save_search_backlinks() {
        let client = in_memory_client();
        client
            .save_note(page("/pages/Rust", "Ownership and [[Borrowing]]"))
            .await
            .unwrap();
        client
            .save_note(page("/pages/Borrowing", "Shared or exclusive"))
            .await
            .unwrap();

        let notes = client.load_notes().await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].path, "/pages/Borrowing");

        let hits = client.search_notes("ownership").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "/pages/Rust");
        assert!(hits[0].snippet.contains("[Ownership]"));

        let backlinks = client.list_backlinks("/pages/Borrowing").await.unwrap();
        assert_eq!(backlinks.len(), 1);
        assert_eq!(backlinks[0].path, "/pages/Rust");
    }

    #[tokio::test]
    async fn test_bulk_save_and_delete() {
        let client = in_memory_client();
        client.save_note(page("/pages/Gone", "")).await.unwrap();
        client
            .bulk_save_notes(vec![page("/pages/A", "[[B]]"), page("/pages/B", "")])
            .await
            .unwrap();

        let paths: Vec<String> = client
            .load_notes()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.path)
            .collect();
        assert_eq!(paths, vec!["/pages/A", "/pages/B"]);

        client.delete_note("/pages/A").await.unwrap();
        assert!(client.list_backlinks("/pages/B").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_query() {
        let client = in_memory_client();
        client.save_note(page("/pages/A", "")).await.unwrap();

        let result = client
            .run_query("SELECT path, length(body) AS size FROM pages")
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["path", "size"]);
        assert_eq!(result.rows.len(), 1);
        assert!(!result.truncated);

        let rejected = client.run_query("DROP TABLE pages").await;
        assert!(matches!(rejected, Err(RpcError::Remote(_))));
    }

    #[tokio::test]
    async fn test_validation_error_is_remote() {
        let client = in_memory_client();
        let err = client
            .save_note(PageInput::new("/pages/A", "", ""))
            .await
            .unwrap_err();
        match err {
            RpcError::Remote(message) => assert_eq!(message, "title is required"),
            other => panic!("Expected Remote, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_sends_cancel_notice() {
        // A gateway that reads requests but never answers
        let (requests, mut inbound) = mpsc::unbounded_channel();
        let (response_tx, responses) = mpsc::unbounded_channel();
        let client = Client::connect(
            Endpoint {
                requests,
                responses,
            },
            Duration::from_millis(20),
        );

        let err = client
            .save_note(page("/pages/A", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Timeout { id: 1, .. }));

        let sent = inbound.recv().await.unwrap();
        assert_eq!(sent["type"], "saveNote");
        let cancel = inbound.recv().await.unwrap();
        assert_eq!(cancel["type"], "cancelRequest");
        assert_eq!(cancel["payload"]["targetId"], 1);
        assert_eq!(cancel["id"], 2);

        // A late answer has nobody to go to
        response_tx.send(Response::success(1, Value::Null)).unwrap();
        assert!(lock(&client.pending).is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_database() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        let client = Client::spawn(&Config::with_data_dir(blocker.join("data")));
        match client.load_notes().await.unwrap_err() {
            RpcError::Remote(message) => assert_eq!(message, "database is not available"),
            other => panic!("Expected Remote, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_gateway_is_disconnected() {
        let (requests, request_rx) = mpsc::unbounded_channel();
        let (response_tx, responses) = mpsc::unbounded_channel::<Response>();
        drop(request_rx);
        drop(response_tx);

        let client = Client::connect(
            Endpoint {
                requests,
                responses,
            },
            Duration::from_secs(1),
        );
        assert!(matches!(
            client.load_notes().await,
            Err(RpcError::Disconnected)
        ));
    }
}
