//! In-memory implementation of [`DataService`].
//!
//! Tables live in process memory and must be declared up front with
//! [`InMemoryDataService::create_table`], naming the primary key column that
//! receives auto-increment ids on insert. An insert may also supply its own
//! positive integer key, which advances the counter past it the way
//! `AUTO_INCREMENT` does. Key comparison follows MySQL's loose equality
//! between numbers and numeric strings.

use crate::error::DataAccessError;
use crate::identifier;
use crate::service::{DataService, Record, check_key_unchanged, display_key, loosely_equal};
use async_trait::async_trait;
use convo_core::Result;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Debug)]
struct Table {
    primary_key: String,
    next_id: u64,
    rows: BTreeMap<u64, Record>,
}

impl Table {
    fn new(primary_key: String) -> Self {
        Self {
            primary_key,
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }

    fn find_id(&self, key_field: &str, key_value: &Value) -> Option<u64> {
        self.rows
            .iter()
            .find(|(_, row)| {
                row.get(key_field)
                    .is_some_and(|value| loosely_equal(value, key_value))
            })
            .map(|(id, _)| *id)
    }

    /// Picks the id for a new row: the explicit key if `data` has one,
    /// otherwise the next auto-increment value.
    fn assign_id(&mut self, table: &str, data: &Record) -> Result<u64, DataAccessError> {
        let explicit = match data.get(&self.primary_key) {
            None | Some(Value::Null) => None,
            Some(value) => match explicit_key(value) {
                Some(0) => None,
                Some(id) => Some(id),
                None => {
                    return Err(DataAccessError::InvalidKey {
                        table: table.to_string(),
                        key_field: self.primary_key.clone(),
                        key_value: display_key(value),
                    }
                    .into());
                }
            },
        };

        let id = match explicit {
            Some(id) if self.rows.contains_key(&id) => {
                return Err(DataAccessError::DuplicateKey {
                    table: table.to_string(),
                    details: format!("{} = {id}", self.primary_key),
                }
                .into());
            }
            Some(id) => id,
            None => self.next_id,
        };
        self.next_id = self.next_id.max(id.saturating_add(1));
        Ok(id)
    }
}

fn explicit_key(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

type TableKey = (String, String);

/// A process-local data service.
///
/// Cloning is cheap; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataService {
    tables: Arc<RwLock<HashMap<TableKey, Table>>>,
}

impl InMemoryDataService {
    /// Creates a service with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a table. Declaring an existing table is a no-op.
    pub fn create_table(
        &self,
        database: &str,
        table: &str,
        primary_key: &str,
    ) -> Result<(), DataAccessError> {
        identifier::qualified_table(database, table)?;
        identifier::quote(primary_key)?;

        let mut tables = self.write();
        tables
            .entry((database.to_string(), table.to_string()))
            .or_insert_with(|| Table::new(primary_key.to_string()));
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TableKey, Table>> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<TableKey, Table>> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn with_table<T>(
        &self,
        database: &str,
        table: &str,
        f: impl FnOnce(&Table) -> Result<T, DataAccessError>,
    ) -> Result<T, DataAccessError> {
        identifier::qualified_table(database, table)?;
        let tables = self.read();
        let entry = tables
            .get(&(database.to_string(), table.to_string()))
            .ok_or_else(|| table_not_found(database, table))?;
        f(entry)
    }

    fn with_table_mut<T>(
        &self,
        database: &str,
        table: &str,
        f: impl FnOnce(&mut Table) -> Result<T, DataAccessError>,
    ) -> Result<T, DataAccessError> {
        identifier::qualified_table(database, table)?;
        let mut tables = self.write();
        let entry = tables
            .get_mut(&(database.to_string(), table.to_string()))
            .ok_or_else(|| table_not_found(database, table))?;
        f(entry)
    }
}

#[async_trait]
impl DataService for InMemoryDataService {
    async fn fetch_one(
        &self,
        database: &str,
        table: &str,
        key_field: &str,
        key_value: &Value,
    ) -> Result<Option<Record>, DataAccessError> {
        identifier::quote(key_field)?;
        self.with_table(database, table, |t| {
            Ok(t.find_id(key_field, key_value)
                .and_then(|id| t.rows.get(&id).cloned()))
        })
    }

    async fn fetch_paginated(
        &self,
        database: &str,
        table: &str,
        order_by: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Record>, DataAccessError> {
        if let Some(column) = order_by {
            identifier::quote(column)?;
        }
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        self.with_table(database, table, |t| {
            // Rows are held in key order; the stable sort keeps it for ties.
            let mut rows: Vec<&Record> = t.rows.values().collect();
            if let Some(column) = order_by.filter(|column| *column != t.primary_key) {
                rows.sort_by(|a, b| compare_column(a.get(column), b.get(column)));
            }
            Ok(rows.into_iter().skip(offset).take(limit).cloned().collect())
        })
    }

    async fn insert(
        &self,
        database: &str,
        table: &str,
        data: Record,
    ) -> Result<u64, DataAccessError> {
        check_columns(table, &data)?;
        self.with_table_mut(database, table, |t| {
            let id = t.assign_id(table, &data)?;
            let primary_key = t.primary_key.clone();

            let mut row = Record::new();
            row.insert(primary_key.clone(), Value::from(id));
            row.extend(data.into_iter().filter(|(column, _)| *column != primary_key));
            t.rows.insert(id, row);

            debug!(database, table, inserted_id = id, "inserted row");
            Ok(id)
        })
    }

    async fn update(
        &self,
        database: &str,
        table: &str,
        data: Record,
        key_field: &str,
        key_value: &Value,
    ) -> Result<(), DataAccessError> {
        check_columns(table, &data)?;
        identifier::quote(key_field)?;
        check_key_unchanged(table, &data, key_field, key_value)?;
        self.with_table_mut(database, table, |t| {
            let id = t
                .find_id(key_field, key_value)
                .ok_or_else(|| not_found(table, key_field, key_value))?;
            let primary_key = t.primary_key.clone();
            check_key_unchanged(table, &data, &primary_key, &Value::from(id))?;
            if let Some(row) = t.rows.get_mut(&id) {
                row.extend(data.into_iter().filter(|(column, _)| *column != primary_key));
            }
            Ok(())
        })
    }

    async fn delete(
        &self,
        database: &str,
        table: &str,
        key_field: &str,
        key_value: &Value,
    ) -> Result<(), DataAccessError> {
        identifier::quote(key_field)?;
        self.with_table_mut(database, table, |t| {
            let id = t
                .find_id(key_field, key_value)
                .ok_or_else(|| not_found(table, key_field, key_value))?;
            t.rows.remove(&id);
            Ok(())
        })
    }

    async fn count_all(&self, database: &str, table: &str) -> Result<u64, DataAccessError> {
        self.with_table(database, table, |t| Ok(t.rows.len() as u64))
    }
}

fn check_columns(table: &str, data: &Record) -> Result<(), DataAccessError> {
    if data.is_empty() {
        return Err(DataAccessError::EmptyData {
            table: table.to_string(),
        }
        .into());
    }
    for column in data.keys() {
        identifier::quote(column)?;
    }
    Ok(())
}

/// Ascending column order with NULLs first, as MySQL sorts.
fn compare_column(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|value| !value.is_null());
    let b = b.filter(|value| !value.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => display_key(x).cmp(&display_key(y)),
    }
}

fn table_not_found(database: &str, table: &str) -> rootcause::Report<DataAccessError> {
    DataAccessError::TableNotFound {
        database: database.to_string(),
        table: table.to_string(),
    }
    .into()
}

fn not_found(table: &str, key_field: &str, key_value: &Value) -> rootcause::Report<DataAccessError> {
    DataAccessError::RecordNotFound {
        table: table.to_string(),
        key_field: key_field.to_string(),
        key_value: display_key(key_value),
    }
    .into()
}
