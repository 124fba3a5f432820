//! RPC envelope types
//!
//! Requests are JSON objects `{id, type, payload}`; responses are
//! `{id, ok: true, result}` or `{id, ok: false, error}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::PageInput;

/// Request identifier; always positive
pub type RequestId = u64;

/// Every operation the gateway understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Operation {
    LoadNotes,
    SaveNote(PageInput),
    DeleteNote(PathArg),
    BulkSaveNotes(Vec<PageInput>),
    SearchNotes(QueryArg),
    ListBacklinks(PathArg),
    RunQuery(QueryArg),
    /// Advisory: suppresses the named request's response
    CancelRequest(CancelArg),
}

impl Operation {
    /// Wire tag, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Operation::LoadNotes => "loadNotes",
            Operation::SaveNote(_) => "saveNote",
            Operation::DeleteNote(_) => "deleteNote",
            Operation::BulkSaveNotes(_) => "bulkSaveNotes",
            Operation::SearchNotes(_) => "searchNotes",
            Operation::ListBacklinks(_) => "listBacklinks",
            Operation::RunQuery(_) => "runQuery",
            Operation::CancelRequest(_) => "cancelRequest",
        }
    }
}

/// A path given either as `{path}` or as a bare string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathArg {
    Object { path: String },
    Bare(String),
}

impl PathArg {
    pub fn path(&self) -> &str {
        match self {
            PathArg::Object { path } | PathArg::Bare(path) => path,
        }
    }
}

impl From<&str> for PathArg {
    fn from(path: &str) -> Self {
        PathArg::Object {
            path: path.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryArg {
    #[serde(default)]
    pub query: String,
}

impl From<&str> for QueryArg {
    fn from(query: &str) -> Self {
        Self {
            query: query.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelArg {
    pub target_id: RequestId,
}

/// A decoded request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub operation: Operation,
}

impl Request {
    pub fn new(id: RequestId, operation: Operation) -> Self {
        Self { id, operation }
    }

    /// Encode as a `{id, type, payload}` object
    pub fn encode(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(&self.operation)?;
        if let Value::Object(map) = &mut value {
            map.insert("id".to_string(), Value::from(self.id));
        }
        Ok(value)
    }
}

/// Why an inbound message could not be turned into a `Request`
#[derive(Debug, PartialEq)]
pub enum DecodeError {
    /// No usable id; nothing can be sent back
    MissingId,
    /// The id is fine but the rest is not; answer with an error
    Invalid { id: RequestId, reason: String },
}

/// Decode an inbound envelope
pub fn decode(message: &Value) -> Result<Request, DecodeError> {
    let id = message
        .get("id")
        .and_then(Value::as_u64)
        .filter(|id| *id > 0)
        .ok_or(DecodeError::MissingId)?;

    let operation = Operation::deserialize(message).map_err(|e| DecodeError::Invalid {
        id,
        reason: e.to_string(),
    })?;
    Ok(Request { id, operation })
}

/// A response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Success {
        id: RequestId,
        ok: Succeeded,
        #[serde(default)]
        result: Value,
    },
    Failure {
        id: RequestId,
        ok: Failed,
        error: String,
    },
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Response::Success {
            id,
            ok: Succeeded,
            result,
        }
    }

    pub fn failure(id: RequestId, error: impl Into<String>) -> Self {
        Response::Failure {
            id,
            ok: Failed,
            error: error.into(),
        }
    }

    pub fn id(&self) -> RequestId {
        match self {
            Response::Success { id, .. } | Response::Failure { id, .. } => *id,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Success { .. })
    }
}

/// Serializes as `true`; only deserializes from `true`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Succeeded;

/// Serializes as `false`; only deserializes from `false`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failed;

macro_rules! bool_marker {
    ($ty:ident, $value:literal) => {
        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_bool($value)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if bool::deserialize(deserializer)? == $value {
                    Ok($ty)
                } else {
                    Err(serde::de::Error::custom(concat!("expected ok: ", $value)))
                }
            }
        }
    };
}

bool_marker!(Succeeded, true);
bool_marker!(Failed, false);
