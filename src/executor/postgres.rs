//! PostgreSQL executor over `may_postgres`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;
use may::sync::Mutex;
use may_postgres::types::{ToSql, Type};
use may_postgres::Client;
use sea_query::Value;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::executor::CommandExecutor;
use crate::mapper::Row;
use crate::sql::{GeneratedCommand, ScalarCommand};

type SharedClient = Arc<Mutex<Client>>;

/// Executes commands on PostgreSQL through `may_postgres`.
///
/// A client is connected lazily per connection string and reused. Each call
/// holds its client for the whole transaction, so calls on one connection
/// string are serialized. The locks are `may`'s, so a waiting coroutine
/// yields instead of blocking its worker thread.
pub struct MayPostgresExecutor {
    clients: Mutex<HashMap<String, SharedClient>>,
}

impl Default for MayPostgresExecutor {
    fn default() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }
}

impl MayPostgresExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an already connected client for `connection_string`.
    pub fn with_client(connection_string: impl Into<String>, client: Client) -> Self {
        let mut clients = HashMap::new();
        clients.insert(connection_string.into(), Arc::new(Mutex::new(client)));
        Self {
            clients: Mutex::new(clients),
        }
    }

    /// The cached client for `connection_string`, connecting on first use.
    /// The map lock is released before the client is used.
    fn client(&self, connection_string: &str) -> Result<SharedClient> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| StoreError::new("postgres client cache is poisoned"))?;
        if let Some(client) = clients.get(connection_string) {
            return Ok(client.clone());
        }
        validate_connection_string(connection_string)?;
        let start = Instant::now();
        let client = may_postgres::connect(connection_string)
            .map_err(|e| StoreError::with_source("cannot connect to postgres", e))?;
        log::debug!("connected to postgres in {:?}", start.elapsed());
        let client = Arc::new(Mutex::new(client));
        clients.insert(connection_string.to_string(), client.clone());
        Ok(client)
    }

    /// Run `f` between `BEGIN` and `COMMIT`, rolling back on failure.
    fn in_transaction<R>(&self, connection_string: &str, f: impl FnOnce(&Client) -> Result<R>) -> Result<R> {
        let shared = self.client(connection_string)?;
        let client = shared
            .lock()
            .map_err(|_| StoreError::new("postgres client is poisoned"))?;

        client.execute("BEGIN", &[]).map_err(store_error)?;
        match f(&client) {
            Ok(result) => {
                client.execute("COMMIT", &[]).map_err(store_error)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback) = client.execute("ROLLBACK", &[]) {
                    log::warn!("rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }
}

fn validate_connection_string(connection_string: &str) -> Result<()> {
    let is_uri = connection_string.starts_with("postgresql://") || connection_string.starts_with("postgres://");
    if connection_string.is_empty() || !(is_uri || connection_string.contains('=')) {
        return Err(StoreError::new(format!(
            "invalid postgres connection string `{}`: expected a postgres:// URI or key=value pairs",
            connection_string
        ))
        .into());
    }
    Ok(())
}

fn store_error(e: may_postgres::Error) -> crate::error::QuarryError {
    StoreError::with_source(format!("postgres: {}", e), e).into()
}

/// Convert bound values to owned `ToSql` parameters, keeping nulls typed so
/// the server accepts them for the column.
fn to_params(values: &[Value]) -> Result<Vec<Box<dyn ToSql>>> {
    let mut params: Vec<Box<dyn ToSql>> = Vec::with_capacity(values.len());
    for value in values {
        let param: Box<dyn ToSql> = match value {
            Value::Bool(v) => Box::new(*v),
            Value::TinyInt(v) => Box::new(v.map(i16::from)),
            Value::SmallInt(v) => Box::new(*v),
            Value::Int(v) => Box::new(*v),
            Value::BigInt(v) => Box::new(*v),
            Value::TinyUnsigned(v) => Box::new(v.map(i16::from)),
            Value::SmallUnsigned(v) => Box::new(v.map(i32::from)),
            Value::Unsigned(v) => Box::new(v.map(i64::from)),
            Value::BigUnsigned(v) => {
                let converted = match v {
                    Some(u) => Some(i64::try_from(*u).map_err(|_| {
                        StoreError::new(format!("BigUnsigned value {} exceeds i64::MAX", u))
                    })?),
                    None => None,
                };
                Box::new(converted)
            }
            Value::Float(v) => Box::new(*v),
            Value::Double(v) => Box::new(*v),
            Value::String(v) => Box::new(v.clone()),
            Value::Char(v) => Box::new(v.map(|c| c.to_string())),
            Value::Bytes(v) => Box::new(v.clone()),
            Value::Json(v) => {
                let json: Option<serde_json::Value> = v.as_ref().map(|j| {
                    let j: &serde_json::Value = j;
                    j.clone()
                });
                Box::new(json)
            }
            Value::Uuid(v) => {
                let id: Option<Uuid> = v.as_ref().map(|u| {
                    let u: &Uuid = u;
                    *u
                });
                Box::new(id)
            }
            Value::ChronoDateTime(v) => {
                let dt: Option<NaiveDateTime> = v.as_ref().map(|d| {
                    let d: &NaiveDateTime = d;
                    *d
                });
                Box::new(dt)
            }
            other => {
                return Err(StoreError::new(format!("unsupported value type in query: {:?}", other)).into())
            }
        };
        params.push(param);
    }
    Ok(params)
}

fn convert_row(row: &may_postgres::Row) -> Result<Row> {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value = if *ty == Type::BOOL {
            Value::Bool(row.try_get(index).map_err(store_error)?)
        } else if *ty == Type::INT2 {
            Value::SmallInt(row.try_get(index).map_err(store_error)?)
        } else if *ty == Type::INT4 {
            Value::Int(row.try_get(index).map_err(store_error)?)
        } else if *ty == Type::INT8 {
            Value::BigInt(row.try_get(index).map_err(store_error)?)
        } else if *ty == Type::FLOAT4 {
            Value::Float(row.try_get(index).map_err(store_error)?)
        } else if *ty == Type::FLOAT8 {
            Value::Double(row.try_get(index).map_err(store_error)?)
        } else if *ty == Type::BYTEA {
            Value::Bytes(row.try_get(index).map_err(store_error)?)
        } else if *ty == Type::JSON || *ty == Type::JSONB {
            let json: Option<serde_json::Value> = row.try_get(index).map_err(store_error)?;
            Value::Json(json.map(Box::new))
        } else if *ty == Type::UUID {
            let id: Option<Uuid> = row.try_get(index).map_err(store_error)?;
            id.map(Value::from).unwrap_or(Value::Uuid(None))
        } else if *ty == Type::TIMESTAMP {
            let dt: Option<NaiveDateTime> = row.try_get(index).map_err(store_error)?;
            dt.map(Value::from).unwrap_or(Value::ChronoDateTime(None))
        } else {
            Value::String(row.try_get(index).map_err(store_error)?)
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

fn execute(client: &Client, command: &GeneratedCommand) -> Result<u64> {
    let params = to_params(&command.values)?;
    let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    client.execute(command.sql.as_str(), &refs).map_err(store_error)
}

fn query(client: &Client, command: &GeneratedCommand) -> Result<Vec<Row>> {
    let params = to_params(&command.values)?;
    let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = client.query(command.sql.as_str(), &refs).map_err(store_error)?;
    rows.iter().map(convert_row).collect()
}

impl CommandExecutor for MayPostgresExecutor {
    fn execute_non_query(&self, commands: &[GeneratedCommand], connection_string: &str) -> Result<u64> {
        #[cfg(feature = "tracing")]
        let _span = crate::executor::execute_span("non_query", &commands.first().map(|c| c.sql.clone()).unwrap_or_default());
        self.in_transaction(connection_string, |client| {
            let mut affected = 0;
            for command in commands {
                affected += execute(client, command)?;
            }
            Ok(affected)
        })
    }

    fn execute_scalar(&self, command: &ScalarCommand, connection_string: &str) -> Result<Value> {
        #[cfg(feature = "tracing")]
        let _span = crate::executor::execute_span("scalar", &command.result.sql);
        self.in_transaction(connection_string, |client| {
            for preparatory in &command.preparatory {
                execute(client, preparatory)?;
            }
            let rows = query(client, &command.result)?;
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
        self.in_transaction(connection_string, |client| query(client, command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_connection_string() {
        assert!(validate_connection_string("postgresql://u:p@localhost/db").is_ok());
        assert!(validate_connection_string("host=localhost user=postgres").is_ok());
        assert!(validate_connection_string("").is_err());
        assert!(validate_connection_string("localhost").is_err());
    }

    #[test]
    fn test_invalid_connection_string_is_not_cached() {
        let executor = MayPostgresExecutor::new();
        assert!(executor.client("localhost").is_err());
        assert!(executor.clients.lock().unwrap().is_empty());
    }

    #[test]
    fn test_params_keep_order_and_nulls() {
        let params = to_params(&[
            Value::Int(Some(1)),
            Value::String(None),
            Value::BigUnsigned(Some(10)),
        ])
        .unwrap();
        assert_eq!(params.len(), 3);
        assert!(to_params(&[Value::BigUnsigned(Some(u64::MAX))]).is_err());
    }
}
