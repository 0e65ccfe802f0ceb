//! SQL statement construction for the MySQL backend.
//!
//! Each builder validates its identifiers and returns the statement text
//! together with its parameters in placeholder order. Nothing here touches
//! a connection.

use crate::error::DataAccessError;
use crate::identifier::{qualified_table, quote};
use crate::service::Record;
use convo_core::Result;
use serde_json::Value;

/// A statement parameter, typed the way it will be bound.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Param {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Strings, plus arrays and objects as their JSON text.
    Text(String),
}

impl From<&Value> for Param {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

/// SQL text and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
}

impl Statement {
    fn new(sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }

    fn with(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }
}

/// `SELECT * ... WHERE key = ?`
pub(crate) fn select_one(
    database: &str,
    table: &str,
    key_field: &str,
    key_value: &Value,
) -> Result<Statement, DataAccessError> {
    let sql = format!(
        "SELECT * FROM {} WHERE {} = ?",
        qualified_table(database, table)?,
        quote(key_field)?
    );
    Ok(Statement::new(sql).with(key_value.into()))
}

/// Locks the keyed row for the rest of the transaction.
pub(crate) fn lock_row(
    database: &str,
    table: &str,
    key_field: &str,
    key_value: &Value,
) -> Result<Statement, DataAccessError> {
    let sql = format!(
        "SELECT 1 FROM {} WHERE {} = ? FOR UPDATE",
        qualified_table(database, table)?,
        quote(key_field)?
    );
    Ok(Statement::new(sql).with(key_value.into()))
}

/// `SELECT * ... [ORDER BY col] LIMIT ? OFFSET ?`
pub(crate) fn select_page(
    database: &str,
    table: &str,
    order_by: Option<&str>,
    offset: u64,
    limit: u64,
) -> Result<Statement, DataAccessError> {
    let order = match order_by {
        Some(column) => format!(" ORDER BY {}", quote(column)?),
        None => String::new(),
    };
    let sql = format!(
        "SELECT * FROM {}{order} LIMIT ? OFFSET ?",
        qualified_table(database, table)?
    );
    Ok(Statement::new(sql)
        .with(Param::UInt(limit))
        .with(Param::UInt(offset)))
}

/// `INSERT INTO ... (cols) VALUES (?, ...)` in column order.
pub(crate) fn insert(
    database: &str,
    table: &str,
    data: &Record,
) -> Result<Statement, DataAccessError> {
    require_columns(table, data)?;
    let columns = data
        .keys()
        .map(|column| quote(column))
        .collect::<Result<Vec<_>, DataAccessError>>()?;
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified_table(database, table)?,
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    );
    Ok(Statement {
        sql,
        params: data.values().map(Param::from).collect(),
    })
}

/// `UPDATE ... SET col = ?, ... WHERE key = ?`; the key binds last.
pub(crate) fn update(
    database: &str,
    table: &str,
    data: &Record,
    key_field: &str,
    key_value: &Value,
) -> Result<Statement, DataAccessError> {
    require_columns(table, data)?;
    let assignments = data
        .keys()
        .map(|column| quote(column).map(|quoted| format!("{quoted} = ?")))
        .collect::<Result<Vec<_>, DataAccessError>>()?;
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        qualified_table(database, table)?,
        assignments.join(", "),
        quote(key_field)?
    );
    let mut params: Vec<Param> = data.values().map(Param::from).collect();
    params.push(key_value.into());
    Ok(Statement { sql, params })
}

/// `DELETE FROM ... WHERE key = ?`
pub(crate) fn delete(
    database: &str,
    table: &str,
    key_field: &str,
    key_value: &Value,
) -> Result<Statement, DataAccessError> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        qualified_table(database, table)?,
        quote(key_field)?
    );
    Ok(Statement::new(sql).with(key_value.into()))
}

pub(crate) fn count(database: &str, table: &str) -> Result<Statement, DataAccessError> {
    Ok(Statement::new(format!(
        "SELECT COUNT(*) AS total FROM {}",
        qualified_table(database, table)?
    )))
}

fn require_columns(table: &str, data: &Record) -> Result<(), DataAccessError> {
    if data.is_empty() {
        return Err(DataAccessError::EmptyData {
            table: table.to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DB: &str = "p1_database";
    const TABLE: &str = "conversations";

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn params_follow_the_json_variant() {
        assert_eq!(Param::from(&json!(null)), Param::Null);
        assert_eq!(Param::from(&json!(true)), Param::Bool(true));
        assert_eq!(Param::from(&json!(-3)), Param::Int(-3));
        assert_eq!(Param::from(&json!(u64::MAX)), Param::UInt(u64::MAX));
        assert_eq!(Param::from(&json!(1.5)), Param::Float(1.5));
        assert_eq!(Param::from(&json!("hi")), Param::Text("hi".to_string()));
        assert_eq!(
            Param::from(&json!(["a", "b"])),
            Param::Text(r#"["a","b"]"#.to_string())
        );
        assert_eq!(
            Param::from(&json!({"k": 1})),
            Param::Text(r#"{"k":1}"#.to_string())
        );
    }

    #[test]
    fn select_one_binds_the_key() {
        let stmt = select_one(DB, TABLE, "convo_id", &json!(7)).expect("valid");
        assert_eq!(
            stmt.sql,
            "SELECT * FROM `p1_database`.`conversations` WHERE `convo_id` = ?"
        );
        assert_eq!(stmt.params, vec![Param::Int(7)]);
    }

    #[test]
    fn lock_row_selects_for_update() {
        let stmt = lock_row(DB, TABLE, "convo_id", &json!(7)).expect("valid");
        assert_eq!(
            stmt.sql,
            "SELECT 1 FROM `p1_database`.`conversations` WHERE `convo_id` = ? FOR UPDATE"
        );
        assert_eq!(stmt.params, vec![Param::Int(7)]);
    }

    #[test]
    fn select_page_orders_then_limits() {
        let stmt = select_page(DB, TABLE, Some("convo_id"), 20, 10).expect("valid");
        assert_eq!(
            stmt.sql,
            "SELECT * FROM `p1_database`.`conversations` ORDER BY `convo_id` LIMIT ? OFFSET ?"
        );
        assert_eq!(stmt.params, vec![Param::UInt(10), Param::UInt(20)]);

        let unordered = select_page(DB, TABLE, None, 0, 5).expect("valid");
        assert_eq!(
            unordered.sql,
            "SELECT * FROM `p1_database`.`conversations` LIMIT ? OFFSET ?"
        );
    }

    #[test]
    fn insert_keeps_column_order() {
        let data = record(json!({
            "name": "Team",
            "participants": "[\"a\"]",
            "isGroup": true
        }));
        let stmt = insert(DB, TABLE, &data).expect("valid");
        assert_eq!(
            stmt.sql,
            "INSERT INTO `p1_database`.`conversations` (`name`, `participants`, `isGroup`) \
             VALUES (?, ?, ?)"
        );
        assert_eq!(
            stmt.params,
            vec![
                Param::Text("Team".to_string()),
                Param::Text("[\"a\"]".to_string()),
                Param::Bool(true),
            ]
        );
    }

    #[test]
    fn update_binds_key_last() {
        let data = record(json!({"name": "after", "messages": null}));
        let stmt = update(DB, TABLE, &data, "convo_id", &json!("12")).expect("valid");
        assert_eq!(
            stmt.sql,
            "UPDATE `p1_database`.`conversations` SET `name` = ?, `messages` = ? \
             WHERE `convo_id` = ?"
        );
        assert_eq!(
            stmt.params,
            vec![
                Param::Text("after".to_string()),
                Param::Null,
                Param::Text("12".to_string()),
            ]
        );
    }

    #[test]
    fn delete_and_count() {
        let stmt = delete(DB, TABLE, "convo_id", &json!(3)).expect("valid");
        assert_eq!(
            stmt.sql,
            "DELETE FROM `p1_database`.`conversations` WHERE `convo_id` = ?"
        );
        assert_eq!(stmt.params, vec![Param::Int(3)]);

        let stmt = count(DB, TABLE).expect("valid");
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS total FROM `p1_database`.`conversations`"
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn rejects_empty_data_and_bad_identifiers() {
        let err = insert(DB, TABLE, &Record::new()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            DataAccessError::EmptyData { .. }
        ));

        let err = update(DB, TABLE, &record(json!({"a b": 1})), "convo_id", &json!(1))
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            DataAccessError::InvalidIdentifier { .. }
        ));

        let err = select_page(DB, TABLE, Some("id; DROP"), 0, 1).unwrap_err();
        assert!(matches!(
            err.current_context(),
            DataAccessError::InvalidIdentifier { .. }
        ));
    }
}
