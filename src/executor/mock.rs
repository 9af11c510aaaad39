//! Scripted in-memory executor

use std::collections::VecDeque;
use std::sync::Mutex;

use sea_query::Value;

use crate::error::{Result, StoreError};
use crate::executor::CommandExecutor;
use crate::mapper::Row;
use crate::sql::{GeneratedCommand, ScalarCommand};

/// A call the executor received.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    NonQuery(Vec<GeneratedCommand>),
    Scalar(ScalarCommand),
    Reader(GeneratedCommand),
}

#[derive(Default)]
struct Script {
    calls: Vec<(Recorded, String)>,
    rows: VecDeque<Vec<Row>>,
    scalars: VecDeque<Value>,
    affected: VecDeque<u64>,
    failure: Option<String>,
}

/// Records every command and answers from queued results.
///
/// Unscripted readers return no rows, unscripted scalars return
/// `Value::BigInt(None)` and unscripted non-queries report one affected row
/// per command.
#[derive(Default)]
pub struct RecordingExecutor {
    script: Mutex<Script>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        match self.script.lock() {
            Ok(mut script) => f(&mut script),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.with_script(|s| s.rows.push_back(rows));
        self
    }

    pub fn push_scalar(&self, value: Value) -> &Self {
        self.with_script(|s| s.scalars.push_back(value));
        self
    }

    pub fn push_affected(&self, count: u64) -> &Self {
        self.with_script(|s| s.affected.push_back(count));
        self
    }

    /// Fail the next call of any kind with a store error.
    pub fn fail_next(&self, message: impl Into<String>) -> &Self {
        let message = message.into();
        self.with_script(|s| s.failure = Some(message));
        self
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.with_script(|s| s.calls.iter().map(|(call, _)| call.clone()).collect())
    }

    /// Every command sent, flattened in execution order.
    pub fn commands(&self) -> Vec<GeneratedCommand> {
        self.recorded()
            .into_iter()
            .flat_map(|call| match call {
                Recorded::NonQuery(commands) => commands,
                Recorded::Scalar(scalar) => {
                    let mut all = scalar.preparatory;
                    all.push(scalar.result);
                    all
                }
                Recorded::Reader(command) => vec![command],
            })
            .collect()
    }

    pub fn connection_strings(&self) -> Vec<String> {
        self.with_script(|s| s.calls.iter().map(|(_, cs)| cs.clone()).collect())
    }

    fn record(&self, call: Recorded, connection_string: &str) -> Result<()> {
        self.with_script(|s| {
            s.calls.push((call, connection_string.to_string()));
            match s.failure.take() {
                Some(message) => Err(StoreError::new(message).into()),
                None => Ok(()),
            }
        })
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute_non_query(&self, commands: &[GeneratedCommand], connection_string: &str) -> Result<u64> {
        self.record(Recorded::NonQuery(commands.to_vec()), connection_string)?;
        Ok(self.with_script(|s| s.affected.pop_front().unwrap_or(commands.len() as u64)))
    }

    fn execute_scalar(&self, command: &ScalarCommand, connection_string: &str) -> Result<Value> {
        self.record(Recorded::Scalar(command.clone()), connection_string)?;
        Ok(self.with_script(|s| s.scalars.pop_front().unwrap_or(Value::BigInt(None))))
    }

    fn execute_reader(&self, command: &GeneratedCommand, connection_string: &str) -> Result<Vec<Row>> {
        self.record(Recorded::Reader(command.clone()), connection_string)?;
        Ok(self.with_script(|s| s.rows.pop_front().unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuarryError;

    #[test]
    fn test_replays_scripted_results_in_order() {
        let executor = RecordingExecutor::new();
        executor
            .push_rows(vec![Row::new().with("Id", Value::Int(Some(1)))])
            .push_scalar(Value::BigInt(Some(7)));

        let command = GeneratedCommand::new("SELECT 1", vec![]);
        assert_eq!(executor.execute_reader(&command, "mem").unwrap().len(), 1);
        assert!(executor.execute_reader(&command, "mem").unwrap().is_empty());

        let scalar = ScalarCommand::new(vec![], command.clone());
        assert_eq!(executor.execute_scalar(&scalar, "mem").unwrap(), Value::BigInt(Some(7)));
        assert_eq!(executor.commands().len(), 3);
        assert_eq!(executor.connection_strings(), vec!["mem", "mem", "mem"]);
    }

    #[test]
    fn test_fail_next_is_a_store_error() {
        let executor = RecordingExecutor::new();
        executor.fail_next("disk full");
        let err = executor
            .execute_non_query(&[GeneratedCommand::new("DELETE FROM t", vec![])], "mem")
            .unwrap_err();
        assert!(matches!(err, QuarryError::Store(ref e) if e.message == "disk full"));
        assert_eq!(
            executor
                .execute_non_query(&[GeneratedCommand::new("DELETE FROM t", vec![])], "mem")
                .unwrap(),
            1
        );
    }
}
