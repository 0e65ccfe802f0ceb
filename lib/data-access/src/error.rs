//! Error types for the data-access crate.
//!
//! Every `DataService` operation reports failures as
//! `Report<DataAccessError>`; callers inspect the current context to tell a
//! missing row apart from a storage failure.

use std::fmt;

/// Errors from data-access operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataAccessError {
    /// A database, table or column name is not a plain SQL identifier.
    InvalidIdentifier { identifier: String },
    /// An insert or update was given no columns.
    EmptyData { table: String },
    /// No row matched the key.
    RecordNotFound {
        table: String,
        key_field: String,
        key_value: String,
    },
    /// The target table does not exist.
    TableNotFound { database: String, table: String },
    /// An insert collided with an existing primary key.
    DuplicateKey { table: String, details: String },
    /// An explicit primary key value is not a positive integer.
    InvalidKey {
        table: String,
        key_field: String,
        key_value: String,
    },
    /// An update tried to change the column the row is keyed by.
    KeyChanged { table: String, key_field: String },
    /// Could not obtain a connection.
    ConnectionFailed { details: String },
    /// The statement failed to execute.
    QueryFailed {
        operation: &'static str,
        details: String,
    },
    /// A column value could not be decoded.
    DecodeFailed { column: String, details: String },
}

impl fmt::Display for DataAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIdentifier { identifier } => {
                write!(f, "invalid SQL identifier '{identifier}'")
            }
            Self::EmptyData { table } => write!(f, "no columns given for table '{table}'"),
            Self::RecordNotFound {
                key_field,
                key_value,
                ..
            } => write!(f, "No record found with {key_field} = {key_value}"),
            Self::TableNotFound { database, table } => {
                write!(f, "table '{database}.{table}' doesn't exist")
            }
            Self::DuplicateKey { table, details } => {
                write!(f, "duplicate key in table '{table}': {details}")
            }
            Self::InvalidKey {
                table,
                key_field,
                key_value,
            } => write!(
                f,
                "invalid {key_field} '{key_value}' for table '{table}': expected a positive integer"
            ),
            Self::KeyChanged { table, key_field } => {
                write!(f, "cannot change key column {key_field} of table '{table}'")
            }
            Self::ConnectionFailed { details } => {
                write!(f, "database connection failed: {details}")
            }
            Self::QueryFailed { operation, details } => {
                write!(f, "{operation} failed: {details}")
            }
            Self::DecodeFailed { column, details } => {
                write!(f, "failed to decode column '{column}': {details}")
            }
        }
    }
}

impl std::error::Error for DataAccessError {}

impl DataAccessError {
    /// Returns true if the error means the keyed row does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }

    /// Maps a driver error for the given operation.
    pub(crate) fn from_sqlx(operation: &'static str, err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::ConnectionFailed {
                    details: err.to_string(),
                }
            }
            _ => Self::QueryFailed {
                operation,
                details: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_display() {
        let err = DataAccessError::RecordNotFound {
            table: "conversations".to_string(),
            key_field: "convo_id".to_string(),
            key_value: "7".to_string(),
        };
        assert_eq!(err.to_string(), "No record found with convo_id = 7");
        assert!(err.is_not_found());
    }

    #[test]
    fn query_failed_display() {
        let err = DataAccessError::QueryFailed {
            operation: "insert",
            details: "duplicate entry".to_string(),
        };
        assert!(err.to_string().contains("insert failed"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn pool_timeout_is_a_connection_failure() {
        let err = DataAccessError::from_sqlx("fetch_one", &sqlx::Error::PoolTimedOut);
        assert!(matches!(err, DataAccessError::ConnectionFailed { .. }));
    }
}
