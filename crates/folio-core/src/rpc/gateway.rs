//! Request intake and the single storage worker
//!
//! Two tasks share a `RequestTracker`. The intake task decodes messages,
//! applies cancel notices as soon as they arrive, and queues everything else,
//! including rejections of malformed requests so their answers keep dispatch
//! order. The worker task takes queued jobs one at a time, in order, and runs
//! each request against the store on a blocking thread. Responses for cancelled
//! requests are dropped; the work itself is never interrupted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::handle::StoreHandle;
use super::message::{self, CancelArg, DecodeError, Operation, Request, RequestId, Response};
use super::tracker::{Delivery, RequestTracker, Start};
use super::RpcError;
use crate::store::Store;

/// The client's side of a running gateway
pub struct Endpoint {
    /// Inbound request envelopes
    pub requests: mpsc::UnboundedSender<Value>,
    /// Outbound response envelopes
    pub responses: mpsc::UnboundedReceiver<Response>,
}

type SharedTracker = Arc<Mutex<RequestTracker>>;

/// A queued unit of work for the worker
#[derive(Debug)]
enum Job {
    Run(Request),
    /// Answer a request that failed to decode
    Reject { id: RequestId, reason: String },
}

pub struct Gateway {
    store: Arc<StoreHandle>,
    tracker: SharedTracker,
}

impl Gateway {
    pub fn new(store: Arc<StoreHandle>) -> Self {
        Self {
            store,
            tracker: Arc::new(Mutex::new(RequestTracker::new())),
        }
    }

    /// Start the intake and worker tasks on the current runtime
    ///
    /// Both tasks stop once `Endpoint::requests` is dropped and the queue
    /// has drained; the response channel closes after that.
    pub fn spawn(self) -> Endpoint {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let (job_tx, job_rx) = mpsc::unbounded_channel();

        tokio::spawn(intake(request_rx, job_tx, Arc::clone(&self.tracker)));
        tokio::spawn(work(job_rx, response_tx, self.tracker, self.store));

        Endpoint {
            requests: request_tx,
            responses: response_rx,
        }
    }
}

fn lock(tracker: &Mutex<RequestTracker>) -> MutexGuard<'_, RequestTracker> {
    tracker.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn intake(
    mut inbound: mpsc::UnboundedReceiver<Value>,
    jobs: mpsc::UnboundedSender<Job>,
    tracker: SharedTracker,
) {
    while let Some(raw) = inbound.recv().await {
        match message::decode(&raw) {
            Ok(Request {
                operation: Operation::CancelRequest(CancelArg { target_id }),
                ..
            }) => {
                if lock(&tracker).cancel(target_id) {
                    debug!("Request {} cancelled", target_id);
                } else {
                    debug!("Ignoring cancel for request {} (not in flight)", target_id);
                }
            }
            Ok(request) => {
                debug!("Queued request {} ({})", request.id, request.operation.name());
                lock(&tracker).register(request.id);
                if jobs.send(Job::Run(request)).is_err() {
                    break;
                }
            }
            Err(DecodeError::Invalid { id, reason }) => {
                warn!("Rejecting request {}: {}", id, reason);
                if jobs.send(Job::Reject { id, reason }).is_err() {
                    break;
                }
            }
            Err(DecodeError::MissingId) => {
                warn!("Dropping message without a valid request id");
            }
        }
    }
}

async fn work(
    mut jobs: mpsc::UnboundedReceiver<Job>,
    responses: mpsc::UnboundedSender<Response>,
    tracker: SharedTracker,
    store: Arc<StoreHandle>,
) {
    while let Some(job) = jobs.recv().await {
        let response = match job {
            Job::Run(request) => match process(request, &tracker, &store).await {
                Some(response) => response,
                None => continue,
            },
            Job::Reject { id, reason } => {
                Response::failure(id, format!("invalid request: {}", reason))
            }
        };

        if responses.send(response).is_err() {
            break;
        }
    }
}

/// Run one tracked request; `None` when it was cancelled
async fn process(
    Request { id, operation }: Request,
    tracker: &Mutex<RequestTracker>,
    store: &StoreHandle,
) -> Option<Response> {
    if lock(tracker).begin(id) == Start::Skip {
        debug!("Skipping cancelled request {}", id);
        return None;
    }

    let response = match run(store, operation).await {
        Ok(result) => Response::success(id, result),
        Err(e) => Response::failure(id, e.to_string()),
    };

    match lock(tracker).finish(id) {
        Delivery::Send => Some(response),
        Delivery::Suppress => {
            debug!("Suppressed response for cancelled request {}", id);
            None
        }
    }
}

async fn run(handle: &StoreHandle, operation: Operation) -> Result<Value, RpcError> {
    let store = handle.get().await?;
    tokio::task::spawn_blocking(move || {
        let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
        execute(&mut store, operation)
    })
    .await
    .map_err(|e| RpcError::Worker(e.to_string()))?
}

/// Run one operation against the store
pub fn execute(store: &mut Store, operation: Operation) -> Result<Value, RpcError> {
    match operation {
        Operation::LoadNotes => encode(store.load_all()?),
        Operation::SaveNote(input) => {
            store.save(input)?;
            Ok(Value::Null)
        }
        Operation::DeleteNote(arg) => {
            store.delete(arg.path())?;
            Ok(Value::Null)
        }
        Operation::BulkSaveNotes(inputs) => {
            store.bulk_replace(&inputs)?;
            Ok(Value::Null)
        }
        Operation::SearchNotes(arg) => encode(store.search(&arg.query)?),
        Operation::ListBacklinks(arg) => encode(store.backlinks_to(arg.path())?),
        Operation::RunQuery(arg) => encode(store.run_query(&arg.query)?),
        // Consumed by intake; never queued
        Operation::CancelRequest(_) => Ok(Value::Null),
    }
}

fn encode<T: Serialize>(result: T) -> Result<Value, RpcError> {
    Ok(serde_json::to_value(result)?)
}
