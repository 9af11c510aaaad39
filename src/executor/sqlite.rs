//! SQLite executor over `rusqlite`

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDateTime;
use rusqlite::types::Value as SqliteValue;
use rusqlite::{params_from_iter, Connection, Transaction};
use sea_query::Value;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::executor::CommandExecutor;
use crate::mapper::Row;
use crate::sql::{GeneratedCommand, ScalarCommand};

/// Executes commands against SQLite databases.
///
/// One connection is opened per connection string and kept for the life of
/// the executor, so `:memory:` databases and `last_insert_rowid()` stay
/// bound to the same session. Calls on the same database are serialized.
///
/// Connection strings are file paths or `:memory:`, optionally prefixed with
/// `sqlite://` or `sqlite:`.
#[derive(Default)]
pub struct SqliteExecutor {
    connections: Mutex<HashMap<String, Connection>>,
}

impl SqliteExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_connection<R>(
        &self,
        connection_string: &str,
        f: impl FnOnce(&mut Connection) -> Result<R>,
    ) -> Result<R> {
        let mut connections = self
            .connections
            .lock()
            .map_err(|_| StoreError::new("sqlite connection cache is poisoned"))?;
        if !connections.contains_key(connection_string) {
            let path = connection_string
                .strip_prefix("sqlite://")
                .or_else(|| connection_string.strip_prefix("sqlite:"))
                .unwrap_or(connection_string);
            let connection = if path == ":memory:" {
                Connection::open_in_memory()
            } else {
                Connection::open(path)
            }
            .map_err(|e| StoreError::with_source(format!("cannot open sqlite database `{}`", path), e))?;
            log::debug!("opened sqlite database {}", path);
            connections.insert(connection_string.to_string(), connection);
        }
        match connections.get_mut(connection_string) {
            Some(connection) => f(connection),
            None => Err(StoreError::new("sqlite connection vanished from cache").into()),
        }
    }

    /// Run `f` in a transaction, committing on success. Dropping an
    /// uncommitted `rusqlite::Transaction` rolls it back.
    fn in_transaction<R>(
        &self,
        connection_string: &str,
        f: impl FnOnce(&Transaction<'_>) -> Result<R>,
    ) -> Result<R> {
        self.with_connection(connection_string, |connection| {
            let tx = connection.transaction().map_err(store_error)?;
            let result = f(&tx)?;
            tx.commit().map_err(store_error)?;
            Ok(result)
        })
    }
}

fn store_error(e: rusqlite::Error) -> crate::error::QuarryError {
    StoreError::with_source(format!("sqlite: {}", e), e).into()
}

fn execute(tx: &Transaction<'_>, command: &GeneratedCommand) -> Result<u64> {
    let params = to_sqlite_values(&command.values)?;
    let affected = tx
        .execute(&command.sql, params_from_iter(params.iter()))
        .map_err(store_error)?;
    Ok(affected as u64)
}

fn query(tx: &Transaction<'_>, command: &GeneratedCommand) -> Result<Vec<Row>> {
    let params = to_sqlite_values(&command.values)?;
    let mut statement = tx.prepare(&command.sql).map_err(store_error)?;
    let names: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let mut rows = statement
        .query(params_from_iter(params.iter()))
        .map_err(store_error)?;

    let mut result = Vec::new();
    while let Some(row) = rows.next().map_err(store_error)? {
        let mut out = Row::new();
        for (index, name) in names.iter().enumerate() {
            let value: SqliteValue = row.get(index).map_err(store_error)?;
            out.push(name.clone(), from_sqlite_value(value));
        }
        result.push(out);
    }
    Ok(result)
}

fn to_sqlite_values(values: &[Value]) -> Result<Vec<SqliteValue>> {
    values.iter().map(to_sqlite_value).collect()
}

fn to_sqlite_value(value: &Value) -> Result<SqliteValue> {
    if crate::value::is_null(value) {
        return Ok(SqliteValue::Null);
    }
    let converted = match value {
        Value::Bool(Some(b)) => SqliteValue::Integer(i64::from(*b)),
        Value::TinyInt(Some(i)) => SqliteValue::Integer(i64::from(*i)),
        Value::SmallInt(Some(i)) => SqliteValue::Integer(i64::from(*i)),
        Value::Int(Some(i)) => SqliteValue::Integer(i64::from(*i)),
        Value::BigInt(Some(i)) => SqliteValue::Integer(*i),
        Value::TinyUnsigned(Some(u)) => SqliteValue::Integer(i64::from(*u)),
        Value::SmallUnsigned(Some(u)) => SqliteValue::Integer(i64::from(*u)),
        Value::Unsigned(Some(u)) => SqliteValue::Integer(i64::from(*u)),
        Value::BigUnsigned(Some(u)) => SqliteValue::Integer(i64::try_from(*u).map_err(|_| {
            StoreError::new(format!("BigUnsigned value {} exceeds i64::MAX", u))
        })?),
        Value::Float(Some(f)) => SqliteValue::Real(f64::from(*f)),
        Value::Double(Some(d)) => SqliteValue::Real(*d),
        Value::String(Some(s)) => SqliteValue::Text(s.clone()),
        Value::Char(Some(c)) => SqliteValue::Text(c.to_string()),
        Value::Bytes(Some(b)) => SqliteValue::Blob(b.clone()),
        Value::Json(Some(j)) => {
            let json: &serde_json::Value = j;
            SqliteValue::Text(json.to_string())
        }
        Value::Uuid(Some(u)) => {
            let id: &Uuid = u;
            SqliteValue::Text(id.hyphenated().to_string())
        }
        Value::ChronoDateTime(Some(dt)) => {
            let dt: &NaiveDateTime = dt;
            SqliteValue::Text(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }
        other => {
            return Err(StoreError::new(format!("unsupported value type for sqlite: {:?}", other)).into())
        }
    };
    Ok(converted)
}

fn from_sqlite_value(value: SqliteValue) -> Value {
    match value {
        SqliteValue::Null => Value::BigInt(None),
        SqliteValue::Integer(i) => Value::BigInt(Some(i)),
        SqliteValue::Real(f) => Value::Double(Some(f)),
        SqliteValue::Text(s) => Value::String(Some(s)),
        SqliteValue::Blob(b) => Value::Bytes(Some(b)),
    }
}

impl CommandExecutor for SqliteExecutor {
    fn execute_non_query(&self, commands: &[GeneratedCommand], connection_string: &str) -> Result<u64> {
        #[cfg(feature = "tracing")]
        let _span = crate::executor::execute_span("non_query", &commands.first().map(|c| c.sql.clone()).unwrap_or_default());
        self.in_transaction(connection_string, |tx| {
            let mut affected = 0;
            for command in commands {
                affected += execute(tx, command)?;
            }
            Ok(affected)
        })
    }

    fn execute_scalar(&self, command: &ScalarCommand, connection_string: &str) -> Result<Value> {
        #[cfg(feature = "tracing")]
        let _span = crate::executor::execute_span("scalar", &command.result.sql);
        self.in_transaction(connection_string, |tx| {
            for preparatory in &command.preparatory {
                execute(tx, preparatory)?;
            }
            let rows = query(tx, &command.result)?;
            Ok(rows
                .into_iter()
                .next()
                .and_then(|row| row.first().map(|(_, value)| value.clone()))
                .unwrap_or(Value::BigInt(None)))
        })
    }

    fn execute_reader(&self, command: &GeneratedCommand, connection_string: &str) -> Result<Vec<Row>> {
        #[cfg(feature = "tracing")]
        let _span = crate::executor::execute_span("reader", &command.sql);
        self.in_transaction(connection_string, |tx| query(tx, command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversion() {
        assert_eq!(to_sqlite_value(&Value::Bool(Some(true))).unwrap(), SqliteValue::Integer(1));
        assert_eq!(to_sqlite_value(&Value::String(None)).unwrap(), SqliteValue::Null);
        assert!(to_sqlite_value(&Value::BigUnsigned(Some(u64::MAX))).is_err());
        assert_eq!(
            to_sqlite_value(&Value::Json(Some(Box::new(serde_json::json!({"a": 1}))))).unwrap(),
            SqliteValue::Text("{\"a\":1}".to_string())
        );
    }

    #[test]
    fn test_memory_database_keeps_its_session() {
        let executor = SqliteExecutor::new();
        let cs = "sqlite::memory:";
        executor
            .execute_non_query(
                &[GeneratedCommand::new(
                    "CREATE TABLE t (Id INTEGER PRIMARY KEY AUTOINCREMENT, Name TEXT NOT NULL)",
                    vec![],
                )],
                cs,
            )
            .unwrap();

        let insert = ScalarCommand::new(
            vec![GeneratedCommand::new(
                "INSERT INTO t (Name) VALUES (?)",
                vec![Value::String(Some("a".into()))],
            )],
            GeneratedCommand::new("SELECT last_insert_rowid()", vec![]),
        );
        assert_eq!(executor.execute_scalar(&insert, cs).unwrap(), Value::BigInt(Some(1)));

        let rows = executor
            .execute_reader(&GeneratedCommand::new("SELECT Id, Name FROM t", vec![]), cs)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Name"), Some(&Value::String(Some("a".into()))));
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let executor = SqliteExecutor::new();
        let cs = ":memory:";
        executor
            .execute_non_query(&[GeneratedCommand::new("CREATE TABLE t (Name TEXT NOT NULL)", vec![])], cs)
            .unwrap();
        let result = executor.execute_non_query(
            &[
                GeneratedCommand::new("INSERT INTO t (Name) VALUES (?)", vec![Value::String(Some("a".into()))]),
                GeneratedCommand::new("INSERT INTO t (Name) VALUES (?)", vec![Value::String(None)]),
            ],
            cs,
        );
        assert!(result.is_err());
        let rows = executor
            .execute_reader(&GeneratedCommand::new("SELECT Name FROM t", vec![]), cs)
            .unwrap();
        assert!(rows.is_empty());
    }
}
