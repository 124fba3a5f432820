//! Data models for Folio
//!
//! Defines the stored page, the write-side input, and the result shapes
//! returned by search and the query sandbox.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Namespace every page path and link target lives under
pub const PAGE_ROOT: &str = "/pages/";

/// Maximum path length, in characters
pub const MAX_PATH_LEN: usize = 512;
/// Maximum title length, in characters
pub const MAX_TITLE_LEN: usize = 1024;
/// Maximum body length, in characters
pub const MAX_BODY_LEN: usize = 50_000;

/// A stored page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Unique path, e.g. `/pages/Rust`
    pub path: String,
    pub title: String,
    /// Page text; may contain `[[wiki links]]`
    pub body: String,
    /// ISO-8601 timestamp of the last save
    pub updated_at: String,
}

/// A page as submitted for saving
///
/// `updated_at` is optional; the current time is used when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInput {
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl PageInput {
    pub fn new(
        path: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            body: body.into(),
            updated_at: None,
        }
    }

    /// Set an explicit timestamp
    pub fn with_updated_at(mut self, updated_at: impl Into<String>) -> Self {
        self.updated_at = Some(updated_at.into());
        self
    }

    /// Check field presence and length bounds
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_path(&self.path)?;
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        check_len("title", &self.title, MAX_TITLE_LEN)?;
        check_len("body", &self.body, MAX_BODY_LEN)?;
        Ok(())
    }

    /// Validate and resolve into the row that gets written
    pub fn into_page(self) -> Result<Page, ValidationError> {
        self.validate()?;
        Ok(Page {
            path: self.path,
            title: self.title,
            body: self.body,
            updated_at: self.updated_at.unwrap_or_else(now_timestamp),
        })
    }
}

impl From<Page> for PageInput {
    fn from(page: Page) -> Self {
        Self {
            path: page.path,
            title: page.title,
            body: page.body,
            updated_at: Some(page.updated_at),
        }
    }
}

/// A directed edge in the link graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct PageLink {
    pub source_path: String,
    pub target_path: String,
    /// Label as written between the brackets
    pub display: String,
}

/// One full-text search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    pub path: String,
    pub title: String,
    /// Body excerpt with matches wrapped in `[` `]`
    pub snippet: String,
}

/// Output of an ad-hoc read-only query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    /// More rows matched than were returned
    pub truncated: bool,
}

/// Input rejected before any storage access
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("path is required")]
    MissingPath,

    #[error("title is required")]
    MissingTitle,

    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("query is required")]
    EmptyQuery,

    #[error("only a single statement is allowed")]
    MultipleStatements,

    #[error("only read-only SELECT or WITH queries are allowed")]
    NotReadOnly,
}

/// Check a path used as a key for load/delete
pub fn validate_path(path: &str) -> Result<(), ValidationError> {
    if path.trim().is_empty() {
        return Err(ValidationError::MissingPath);
    }
    check_len("path", path, MAX_PATH_LEN)
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Current UTC time in the `2024-01-31T12:00:00.000Z` form
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
