//! The data-access contract shared by every backend.

use crate::error::DataAccessError;
use async_trait::async_trait;
use convo_core::Result;
use serde_json::{Map, Value};

/// One table row, keyed by column name in column order.
pub type Record = Map<String, Value>;

/// Key-based access to rows of a named `database.table`.
///
/// Identifiers are validated by the implementation; values are always bound
/// as statement parameters.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Fetches the first row whose `key_field` equals `key_value`.
    async fn fetch_one(
        &self,
        database: &str,
        table: &str,
        key_field: &str,
        key_value: &Value,
    ) -> Result<Option<Record>, DataAccessError>;

    /// Fetches at most `limit` rows starting at `offset`.
    ///
    /// Rows are sorted ascending by `order_by` when given; otherwise the
    /// order is whatever storage returns.
    async fn fetch_paginated(
        &self,
        database: &str,
        table: &str,
        order_by: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Record>, DataAccessError>;

    /// Inserts a row and returns its id.
    ///
    /// The id is assigned by storage unless `data` carries an explicit
    /// primary key, in which case that key is stored and returned.
    async fn insert(
        &self,
        database: &str,
        table: &str,
        data: Record,
    ) -> Result<u64, DataAccessError>;

    /// Updates the columns in `data` on the row identified by the key.
    ///
    /// Fails with `RecordNotFound` if no row matches and with `KeyChanged`
    /// if `data` assigns a different value to `key_field`.
    async fn update(
        &self,
        database: &str,
        table: &str,
        data: Record,
        key_field: &str,
        key_value: &Value,
    ) -> Result<(), DataAccessError>;

    /// Deletes the row identified by the key.
    ///
    /// Fails with `RecordNotFound` if no row matches.
    async fn delete(
        &self,
        database: &str,
        table: &str,
        key_field: &str,
        key_value: &Value,
    ) -> Result<(), DataAccessError>;

    /// Counts every row of the table.
    async fn count_all(&self, database: &str, table: &str) -> Result<u64, DataAccessError>;
}

/// Renders a key value the way it appears in error messages.
pub(crate) fn display_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compares key values the way MySQL does, so `7` matches `"7"`.
pub(crate) fn loosely_equal(stored: &Value, key: &Value) -> bool {
    stored == key || display_key(stored) == display_key(key)
}

/// Rejects an update whose data would move the row to another key.
pub(crate) fn check_key_unchanged(
    table: &str,
    data: &Record,
    key_field: &str,
    key_value: &Value,
) -> Result<(), DataAccessError> {
    match data.get(key_field) {
        Some(value) if !loosely_equal(value, key_value) => Err(DataAccessError::KeyChanged {
            table: table.to_string(),
            key_field: key_field.to_string(),
        }
        .into()),
        _ => Ok(()),
    }
}
