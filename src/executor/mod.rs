//! Command execution boundary
//!
//! The core never talks to a driver. It hands [`GeneratedCommand`]s to a
//! [`CommandExecutor`] together with a connection string and receives rows,
//! scalars or affected-row counts back. Store failures come back as
//! [`StoreError`](crate::error::StoreError) and are propagated unchanged.
//!
//! Implementations:
//! - [`MayPostgresExecutor`] (feature `postgres`)
//! - [`SqliteExecutor`] (feature `sqlite`)
//! - [`RecordingExecutor`] (tests, feature `mock`)

#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(test, feature = "mock"))]
pub use mock::{Recorded, RecordingExecutor};
#[cfg(feature = "postgres")]
pub use postgres::MayPostgresExecutor;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;

use sea_query::Value;

use crate::error::Result;
use crate::mapper::Row;
use crate::sql::{GeneratedCommand, ScalarCommand};

/// The contract the core requires of a store.
///
/// Values are bound positionally in the order they appear in
/// `GeneratedCommand::values`; `Value::X(None)` is the store's NULL.
pub trait CommandExecutor: Send + Sync {
    /// Run every command on one session inside one transaction and return
    /// the total number of affected rows. Either all commands take effect or
    /// none do.
    fn execute_non_query(&self, commands: &[GeneratedCommand], connection_string: &str) -> Result<u64>;

    /// Run the preparatory commands, then the result command, on one session
    /// inside one transaction. Returns the first column of the result
    /// command's first row, or `Value::BigInt(None)` when it yields no rows.
    fn execute_scalar(&self, command: &ScalarCommand, connection_string: &str) -> Result<Value>;

    /// Run a query and return its rows with column names in select-list order.
    fn execute_reader(&self, command: &GeneratedCommand, connection_string: &str) -> Result<Vec<Row>>;
}

/// Span around an executor call when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
pub(crate) fn execute_span(operation: &'static str, sql: &str) -> tracing::span::EnteredSpan {
    tracing::debug_span!("quarry.execute", operation, sql).entered()
}
