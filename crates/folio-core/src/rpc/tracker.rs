//! Per-request lifecycle for advisory cancellation
//!
//! A request is `Pending` from intake until the worker picks it up, then
//! `Running`. A cancel notice moves either state to `Cancelled`. Completion
//! removes the entry, and the response is delivered only if the request was
//! never cancelled. Skipped and completed ids leave the table, so it only
//! ever holds in-flight requests.

use std::collections::HashMap;

use super::message::RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Running,
    Cancelled,
}

/// What the worker should do with a request it is about to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    Run,
    Skip,
}

/// What the worker should do with a finished request's response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Send,
    Suppress,
}

#[derive(Debug, Default)]
pub struct RequestTracker {
    states: HashMap<RequestId, RequestState>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request at intake
    pub fn register(&mut self, id: RequestId) {
        self.states.insert(id, RequestState::Pending);
    }

    /// Apply a cancel notice; returns false when `id` is not in flight
    pub fn cancel(&mut self, id: RequestId) -> bool {
        match self.states.get_mut(&id) {
            Some(state) if *state != RequestState::Cancelled => {
                *state = RequestState::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// Transition `Pending -> Running`, or drop a request cancelled while queued
    pub fn begin(&mut self, id: RequestId) -> Start {
        match self.states.get(&id) {
            Some(RequestState::Cancelled) => {
                self.states.remove(&id);
                Start::Skip
            }
            _ => {
                self.states.insert(id, RequestState::Running);
                Start::Run
            }
        }
    }

    /// Complete `id` and decide whether its response goes out
    pub fn finish(&mut self, id: RequestId) -> Delivery {
        match self.states.remove(&id) {
            Some(RequestState::Pending | RequestState::Running) => Delivery::Send,
            // Cancelled, finished twice, or never registered
            Some(RequestState::Cancelled) | None => Delivery::Suppress,
        }
    }

    pub fn state(&self, id: RequestId) -> Option<RequestState> {
        self.states.get(&id).copied()
    }

    /// Number of requests currently tracked
    pub fn in_flight(&self) -> usize {
        self.states.len()
    }
}
