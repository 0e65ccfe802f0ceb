//! SQL identifier validation.
//!
//! Database, table and column names cannot be bound as statement parameters,
//! so they are checked against a conservative grammar and backtick-quoted
//! before being spliced into SQL text.

use crate::error::DataAccessError;
use convo_core::Result;

/// Longest identifier MySQL accepts.
const MAX_IDENTIFIER_LEN: usize = 64;

/// Returns true if `name` is `[A-Za-z_][A-Za-z0-9_]*` and at most 64 chars.
#[must_use]
pub fn is_valid(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_IDENTIFIER_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates and backtick-quotes a single identifier.
pub fn quote(name: &str) -> Result<String, DataAccessError> {
    if !is_valid(name) {
        return Err(DataAccessError::InvalidIdentifier {
            identifier: name.to_string(),
        }
        .into());
    }
    Ok(format!("`{name}`"))
}

/// Validates and quotes a `database.table` pair.
pub fn qualified_table(database: &str, table: &str) -> Result<String, DataAccessError> {
    Ok(format!("{}.{}", quote(database)?, quote(table)?))
}
