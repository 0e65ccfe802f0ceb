//! MySQL implementation of [`DataService`] on top of sqlx.
//!
//! Statements are assembled from validated identifiers and bound values.
//! Result rows are decoded column by column into [`Record`]s based on the
//! column type reported by the server, so any table can be read without a
//! compile-time row type.

use crate::config::DatabaseConfig;
use crate::error::DataAccessError;
use crate::service::{DataService, Record, check_key_unchanged, display_key};
use crate::statement::{self, Param, Statement};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use convo_core::Result;
use rootcause::Report;
use serde_json::Value;
use sqlx::mysql::{
    MySqlArguments, MySqlColumn, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow,
};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row, TypeInfo, ValueRef};
use tracing::{debug, instrument};

/// SQLSTATE for "base table or view not found".
const TABLE_NOT_FOUND_STATE: &str = "42S02";

type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

/// A generic data service for MySQL databases.
#[derive(Clone)]
pub struct MySqlDataService {
    pool: MySqlPool,
}

impl MySqlDataService {
    /// Builds a pool that connects on first use.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn connect_lazy(config: &DatabaseConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password);
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy_with(options);
        Self { pool }
    }
}

#[async_trait]
impl DataService for MySqlDataService {
    #[instrument(skip(self))]
    async fn fetch_one(
        &self,
        database: &str,
        table: &str,
        key_field: &str,
        key_value: &Value,
    ) -> Result<Option<Record>, DataAccessError> {
        let stmt = statement::select_one(database, table, key_field, key_value)?;
        let row = query(&stmt)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("fetch_one", database, table, &e))?;

        row.as_ref().map(decode_row).transpose()
    }

    #[instrument(skip(self))]
    async fn fetch_paginated(
        &self,
        database: &str,
        table: &str,
        order_by: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Record>, DataAccessError> {
        let stmt = statement::select_page(database, table, order_by, offset, limit)?;
        let rows = query(&stmt)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("fetch_paginated", database, table, &e))?;

        debug!(rows = rows.len(), "fetched page");
        rows.iter().map(decode_row).collect()
    }

    #[instrument(skip(self, data), fields(columns = data.len()))]
    async fn insert(
        &self,
        database: &str,
        table: &str,
        data: Record,
    ) -> Result<u64, DataAccessError> {
        let stmt = statement::insert(database, table, &data)?;
        let result = query(&stmt)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("insert", database, table, &e))?;

        let inserted_id = result.last_insert_id();
        debug!(inserted_id, "inserted row");
        Ok(inserted_id)
    }

    #[instrument(skip(self, data), fields(columns = data.len()))]
    async fn update(
        &self,
        database: &str,
        table: &str,
        data: Record,
        key_field: &str,
        key_value: &Value,
    ) -> Result<(), DataAccessError> {
        check_key_unchanged(table, &data, key_field, key_value)?;
        let lock = statement::lock_row(database, table, key_field, key_value)?;
        let stmt = statement::update(database, table, &data, key_field, key_value)?;

        let fail = |e: sqlx::Error| storage_error("update", database, table, &e);
        let mut tx = self.pool.begin().await.map_err(fail)?;
        if query(&lock).fetch_optional(&mut *tx).await.map_err(fail)?.is_none() {
            return Err(not_found(table, key_field, key_value));
        }
        query(&stmt).execute(&mut *tx).await.map_err(fail)?;
        tx.commit().await.map_err(fail)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(
        &self,
        database: &str,
        table: &str,
        key_field: &str,
        key_value: &Value,
    ) -> Result<(), DataAccessError> {
        let stmt = statement::delete(database, table, key_field, key_value)?;
        let result = query(&stmt)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("delete", database, table, &e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(table, key_field, key_value));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_all(&self, database: &str, table: &str) -> Result<u64, DataAccessError> {
        let stmt = statement::count(database, table)?;
        let total: i64 = sqlx::query_scalar(&stmt.sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("count_all", database, table, &e))?;

        Ok(u64::try_from(total).unwrap_or_default())
    }
}

/// Prepares a statement with its parameters bound in order.
fn query(stmt: &Statement) -> MySqlQuery<'_> {
    stmt.params
        .iter()
        .fold(sqlx::query(&stmt.sql), |query, param| match param {
            Param::Null => query.bind(None::<String>),
            Param::Bool(b) => query.bind(*b),
            Param::Int(i) => query.bind(*i),
            Param::UInt(u) => query.bind(*u),
            Param::Float(f) => query.bind(*f),
            Param::Text(s) => query.bind(s.clone()),
        })
}

fn not_found(table: &str, key_field: &str, key_value: &Value) -> Report<DataAccessError> {
    DataAccessError::RecordNotFound {
        table: table.to_string(),
        key_field: key_field.to_string(),
        key_value: display_key(key_value),
    }
    .into()
}

fn storage_error(
    operation: &'static str,
    database: &str,
    table: &str,
    err: &sqlx::Error,
) -> Report<DataAccessError> {
    if let sqlx::Error::Database(db_err) = err {
        if db_err.code().as_deref() == Some(TABLE_NOT_FOUND_STATE) {
            return DataAccessError::TableNotFound {
                database: database.to_string(),
                table: table.to_string(),
            }
            .into();
        }
        if db_err.is_unique_violation() {
            return DataAccessError::DuplicateKey {
                table: table.to_string(),
                details: db_err.message().to_string(),
            }
            .into();
        }
    }
    DataAccessError::from_sqlx(operation, err).into()
}

fn decode_row(row: &MySqlRow) -> Result<Record, DataAccessError> {
    let mut record = Record::new();
    for column in row.columns() {
        let value = decode_column(row, column).map_err(|e| DataAccessError::DecodeFailed {
            column: column.name().to_string(),
            details: e.to_string(),
        })?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

/// How a MySQL column type is turned into JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Unsigned,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Json,
    DateTime,
    Timestamp,
    Date,
    Time,
    Binary,
    Text,
}

impl ColumnKind {
    fn from_type_name(name: &str) -> Self {
        match name {
            "BOOLEAN" => Self::Bool,
            name if name.ends_with("UNSIGNED") => Self::Unsigned,
            "TINYINT" => Self::TinyInt,
            "SMALLINT" => Self::SmallInt,
            "INT" | "MEDIUMINT" => Self::Int,
            "BIGINT" => Self::BigInt,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            "DECIMAL" => Self::Decimal,
            "JSON" => Self::Json,
            "DATETIME" => Self::DateTime,
            "TIMESTAMP" => Self::Timestamp,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                Self::Binary
            }
            _ => Self::Text,
        }
    }
}

fn decode_column(row: &MySqlRow, column: &MySqlColumn) -> std::result::Result<Value, sqlx::Error> {
    let ordinal = column.ordinal();
    if row.try_get_raw(ordinal)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match ColumnKind::from_type_name(column.type_info().name()) {
        ColumnKind::Bool => Value::from(row.try_get::<bool, _>(ordinal)?),
        ColumnKind::Unsigned => Value::from(row.try_get::<u64, _>(ordinal)?),
        ColumnKind::TinyInt => Value::from(row.try_get::<i8, _>(ordinal)?),
        ColumnKind::SmallInt => Value::from(row.try_get::<i16, _>(ordinal)?),
        ColumnKind::Int => Value::from(row.try_get::<i32, _>(ordinal)?),
        ColumnKind::BigInt => Value::from(row.try_get::<i64, _>(ordinal)?),
        ColumnKind::Float => Value::from(row.try_get::<f32, _>(ordinal)?),
        ColumnKind::Double => Value::from(row.try_get::<f64, _>(ordinal)?),
        ColumnKind::Decimal => Value::from(row.try_get_unchecked::<String, _>(ordinal)?),
        ColumnKind::Json => row.try_get::<Value, _>(ordinal)?,
        ColumnKind::DateTime => Value::from(row.try_get::<NaiveDateTime, _>(ordinal)?.to_string()),
        ColumnKind::Timestamp => {
            Value::from(row.try_get::<DateTime<Utc>, _>(ordinal)?.to_rfc3339())
        }
        ColumnKind::Date => Value::from(row.try_get::<NaiveDate, _>(ordinal)?.to_string()),
        ColumnKind::Time => Value::from(row.try_get::<NaiveTime, _>(ordinal)?.to_string()),
        ColumnKind::Binary => {
            let bytes = row.try_get::<Vec<u8>, _>(ordinal)?;
            Value::from(String::from_utf8_lossy(&bytes).into_owned())
        }
        ColumnKind::Text => Value::from(row.try_get::<String, _>(ordinal)?),
    };
    Ok(value)
}
