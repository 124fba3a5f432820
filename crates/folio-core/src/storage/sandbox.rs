//! Read-only ad-hoc queries
//!
//! Lets a user poke at the store with a single SELECT/WITH statement. Rows
//! are capped after execution starts; the query itself is not rewritten.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;

use super::error::StoreResult;
use crate::models::{QueryResult, ValidationError};

/// Maximum number of rows returned to the caller
pub const ROW_CAP: usize = 200;

/// Run one read-only statement, returning at most `ROW_CAP` rows
pub fn run_query(conn: &Connection, text: &str) -> StoreResult<QueryResult> {
    let sql = check_statement(text)?;

    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Err(ValidationError::NotReadOnly.into());
    }

    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = names.len();
    let mut result = QueryResult::default();

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        if result.rows.len() == ROW_CAP {
            // One row past the cap is enough to know there were more
            result.truncated = true;
            break;
        }
        if result.columns.is_empty() {
            result.columns = names.clone();
        }
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(to_json(row.get_ref(i)?));
        }
        result.rows.push(values);
    }

    Ok(result)
}

/// Strip trailing terminators and reject anything but a single read query
fn check_statement(text: &str) -> Result<&str, ValidationError> {
    let sql = text.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if sql.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    if sql.contains(';') {
        return Err(ValidationError::MultipleStatements);
    }

    let keyword = sql
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    if !(keyword.eq_ignore_ascii_case("select") || keyword.eq_ignore_ascii_case("with")) {
        return Err(ValidationError::NotReadOnly);
    }
    Ok(sql)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(BASE64.encode(bytes)),
    }
}
